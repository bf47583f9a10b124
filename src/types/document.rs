//! Brazilian identifiers: CPF/CNPJ documents, CEP postal codes, phones and
//! UC (unidade consumidora) codes.
//!
//! Every type parses from masked or raw input and keeps only the digits.
//! `Display` renders the canonical mask.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("invalid CPF: {0}")]
    InvalidCpf(String),

    #[error("invalid CNPJ: {0}")]
    InvalidCnpj(String),

    #[error("document must have 11 (CPF) or 14 (CNPJ) digits, got {0}")]
    UnknownDocument(usize),

    #[error("invalid CEP: {0} (expected 8 digits)")]
    InvalidCep(String),

    #[error("invalid phone: {0} (expected 10 or 11 digits with area code)")]
    InvalidPhone(String),

    #[error("invalid UC code: {0} (expected 6 to 15 digits)")]
    InvalidUc(String),
}

/// Strip everything but ASCII digits.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn to_digits(s: &str) -> Vec<u32> {
    s.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_same(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

fn cpf_check_digit(digits: &[u32]) -> u32 {
    let start = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (start - i as u32))
        .sum();
    let rest = (sum * 10) % 11;
    if rest == 10 { 0 } else { rest }
}

fn cnpj_check_digit(digits: &[u32]) -> u32 {
    const WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    let weights = &WEIGHTS[WEIGHTS.len() - digits.len()..];
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let rest = sum % 11;
    if rest < 2 { 0 } else { 11 - rest }
}

/// Check a CPF (11 digits, two mod-11 check digits).
pub fn is_valid_cpf(input: &str) -> bool {
    let digits = to_digits(&digits_only(input));
    if digits.len() != 11 || all_same(&digits) {
        return false;
    }
    let first = cpf_check_digit(&digits[..9]);
    let second = cpf_check_digit(&digits[..10]);
    digits[9] == first && digits[10] == second
}

/// Check a CNPJ (14 digits, two weighted mod-11 check digits).
pub fn is_valid_cnpj(input: &str) -> bool {
    let digits = to_digits(&digits_only(input));
    if digits.len() != 14 || all_same(&digits) {
        return false;
    }
    let first = cnpj_check_digit(&digits[..12]);
    let second = cnpj_check_digit(&digits[..13]);
    digits[12] == first && digits[13] == second
}

/// A taxpayer document: CPF for people, CNPJ for companies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Document {
    Cpf(String),
    Cnpj(String),
}

impl Document {
    pub fn digits(&self) -> &str {
        match self {
            Document::Cpf(d) | Document::Cnpj(d) => d,
        }
    }

    pub fn is_company(&self) -> bool {
        matches!(self, Document::Cnpj(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Document::Cpf(_) => "cpf",
            Document::Cnpj(_) => "cnpj",
        }
    }
}

impl FromStr for Document {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = digits_only(s);
        match digits.len() {
            11 if is_valid_cpf(&digits) => Ok(Document::Cpf(digits)),
            11 => Err(DocumentError::InvalidCpf(s.to_string())),
            14 if is_valid_cnpj(&digits) => Ok(Document::Cnpj(digits)),
            14 => Err(DocumentError::InvalidCnpj(s.to_string())),
            n => Err(DocumentError::UnknownDocument(n)),
        }
    }
}

impl TryFrom<String> for Document {
    type Error = DocumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Document> for String {
    fn from(doc: Document) -> Self {
        doc.digits().to_string()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Document::Cpf(d) => write!(f, "{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11]),
            Document::Cnpj(d) => write!(
                f,
                "{}.{}.{}/{}-{}",
                &d[0..2],
                &d[2..5],
                &d[5..8],
                &d[8..12],
                &d[12..14]
            ),
        }
    }
}

/// Brazilian postal code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cep(String);

impl Cep {
    pub fn digits(&self) -> &str {
        &self.0
    }
}

impl FromStr for Cep {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = digits_only(s);
        // Reject letters mixed into the code rather than silently dropping them.
        let stray = s.chars().any(|c| !c.is_ascii_digit() && c != '-' && c != '.' && !c.is_whitespace());
        if digits.len() != 8 || stray {
            return Err(DocumentError::InvalidCep(s.to_string()));
        }
        Ok(Cep(digits))
    }
}

impl TryFrom<String> for Cep {
    type Error = DocumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cep> for String {
    fn from(cep: Cep) -> Self {
        cep.0
    }
}

impl fmt::Display for Cep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", &self.0[..5], &self.0[5..])
    }
}

/// Phone number with area code (landline or mobile).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl FromStr for Phone {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = digits_only(s);
        match digits.len() {
            10 | 11 => Ok(Phone(digits)),
            _ => Err(DocumentError::InvalidPhone(s.to_string())),
        }
    }
}

impl TryFrom<String> for Phone {
    type Error = DocumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.0;
        let split = d.len() - 4;
        write!(f, "({}) {}-{}", &d[..2], &d[2..split], &d[split..])
    }
}

/// Unidade consumidora: the utility's identifier for a metered connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UcCode(String);

impl UcCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for UcCode {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = digits_only(trimmed);
        let only_digits_and_separators = trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-' || c == '.' || c == '/');
        if !only_digits_and_separators || !(6..=15).contains(&digits.len()) {
            return Err(DocumentError::InvalidUc(s.to_string()));
        }
        Ok(UcCode(digits))
    }
}

impl TryFrom<String> for UcCode {
    type Error = DocumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UcCode> for String {
    fn from(uc: UcCode) -> Self {
        uc.0
    }
}

impl fmt::Display for UcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_cpf() {
        assert!(is_valid_cpf("529.982.247-25"));
        assert!(is_valid_cpf("52998224725"));
    }

    #[test]
    fn test_invalid_cpf() {
        assert!(!is_valid_cpf("529.982.247-26"));
        assert!(!is_valid_cpf("111.111.111-11"));
        assert!(!is_valid_cpf("1234567890"));
    }

    #[test]
    fn test_valid_cnpj() {
        assert!(is_valid_cnpj("11.222.333/0001-81"));
        assert!(is_valid_cnpj("11222333000181"));
    }

    #[test]
    fn test_invalid_cnpj() {
        assert!(!is_valid_cnpj("11.222.333/0001-80"));
        assert!(!is_valid_cnpj("00000000000000"));
    }

    #[test]
    fn test_document_parse_and_mask() {
        let cpf: Document = "52998224725".parse().unwrap();
        assert_eq!(cpf, Document::Cpf("52998224725".to_string()));
        assert_eq!(cpf.to_string(), "529.982.247-25");
        assert!(!cpf.is_company());

        let cnpj: Document = "11.222.333/0001-81".parse().unwrap();
        assert!(cnpj.is_company());
        assert_eq!(cnpj.to_string(), "11.222.333/0001-81");
    }

    #[test]
    fn test_document_parse_errors() {
        assert!(matches!(
            "123".parse::<Document>(),
            Err(DocumentError::UnknownDocument(3))
        ));
        assert!(matches!(
            "529.982.247-00".parse::<Document>(),
            Err(DocumentError::InvalidCpf(_))
        ));
    }

    #[test]
    fn test_document_serde_uses_digits() {
        let cpf: Document = "529.982.247-25".parse().unwrap();
        let json = serde_json::to_string(&cpf).unwrap();
        assert_eq!(json, "\"52998224725\"");
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cpf);
        assert!(serde_json::from_str::<Document>("\"52998224700\"").is_err());
    }

    #[test]
    fn test_cep() {
        let cep: Cep = "01310-100".parse().unwrap();
        assert_eq!(cep.digits(), "01310100");
        assert_eq!(cep.to_string(), "01310-100");
        assert!("0131010".parse::<Cep>().is_err());
        assert!("01310-10a".parse::<Cep>().is_err());
    }

    #[test]
    fn test_phone_masks() {
        let mobile: Phone = "11987654321".parse().unwrap();
        assert_eq!(mobile.to_string(), "(11) 98765-4321");
        let landline: Phone = "(31) 3333-4444".parse().unwrap();
        assert_eq!(landline.to_string(), "(31) 3333-4444");
        assert!("98765".parse::<Phone>().is_err());
    }

    #[test]
    fn test_uc_code() {
        let uc: UcCode = "3000.123.456".parse().unwrap();
        assert_eq!(uc.as_str(), "3000123456");
        assert!("12345".parse::<UcCode>().is_err());
        assert!("UC-123456".parse::<UcCode>().is_err());
    }
}
