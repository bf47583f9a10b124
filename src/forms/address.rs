use crate::lookup::{AddressLookup, LookupError};
use crate::types::{Address, Cep};

use super::{FieldError, FormError, FormState, optional, parsed, required};

const FIELDS: &[&str] = &[
    "cep",
    "street",
    "number",
    "complement",
    "neighborhood",
    "city",
    "state",
];

/// Postal address input.
#[derive(Debug, Clone, Default)]
pub struct AddressForm {
    pub cep: String,
    pub street: String,
    pub number: String,
    pub complement: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

impl AddressForm {
    /// Fill street, neighborhood, city and state from the CEP.
    ///
    /// Returns `Ok(false)` and leaves the fields untouched when the CEP is
    /// malformed or unknown; the operator then types the address by hand.
    pub async fn fill_from_cep(&mut self, lookup: &impl AddressLookup) -> Result<bool, LookupError> {
        let Ok(cep) = self.cep.parse::<Cep>() else {
            return Ok(false);
        };
        let Some(found) = lookup.lookup_cep(&cep).await? else {
            return Ok(false);
        };

        self.cep = cep.to_string();
        if !found.street.is_empty() {
            self.street = found.street;
        }
        if !found.neighborhood.is_empty() {
            self.neighborhood = found.neighborhood;
        }
        self.city = found.city;
        self.state = found.state;
        if self.complement.is_empty() {
            if let Some(complement) = found.complement {
                self.complement = complement;
            }
        }
        Ok(true)
    }

    pub fn load(&mut self, address: &Address) {
        self.cep = address.cep.as_ref().map(ToString::to_string).unwrap_or_default();
        self.street = address.street.clone();
        self.number = address.number.clone();
        self.complement = address.complement.clone().unwrap_or_default();
        self.neighborhood = address.neighborhood.clone();
        self.city = address.city.clone();
        self.state = address.state.clone();
    }

    pub fn is_blank(&self) -> bool {
        FIELDS.iter().all(|f| self.value(f).is_none_or(str::is_empty))
    }

    pub fn build(&self) -> Result<Address, FormError> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(FormError::Incomplete(errors));
        }
        Ok(Address {
            cep: self.cep.trim().parse().ok(),
            street: self.street.trim().to_string(),
            number: self.number.trim().to_string(),
            complement: optional(&self.complement),
            neighborhood: self.neighborhood.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_uppercase(),
        })
    }
}

impl FormState for AddressForm {
    fn fields(&self) -> &'static [&'static str] {
        FIELDS
    }

    fn update(&mut self, field: &str, value: &str) -> Result<(), FormError> {
        let slot = match field {
            "cep" => &mut self.cep,
            "street" => &mut self.street,
            "number" => &mut self.number,
            "complement" => &mut self.complement,
            "neighborhood" => &mut self.neighborhood,
            "city" => &mut self.city,
            "state" => &mut self.state,
            _ => return Err(FormError::UnknownField(field.to_string())),
        };
        *slot = value.trim().to_string();
        Ok(())
    }

    fn value(&self, field: &str) -> Option<&str> {
        match field {
            "cep" => Some(&self.cep),
            "street" => Some(&self.street),
            "number" => Some(&self.number),
            "complement" => Some(&self.complement),
            "neighborhood" => Some(&self.neighborhood),
            "city" => Some(&self.city),
            "state" => Some(&self.state),
            _ => None,
        }
    }

    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        parsed::<Cep>(&mut errors, "cep", &self.cep, false);
        required(&mut errors, "street", &self.street, "Street");
        required(&mut errors, "number", &self.number, "Number");
        required(&mut errors, "neighborhood", &self.neighborhood, "Neighborhood");
        required(&mut errors, "city", &self.city, "City");
        let state = self.state.trim();
        if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
            errors.push(FieldError::new("state", "State must be a two-letter UF"));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeCep(Option<Address>);

    impl AddressLookup for FakeCep {
        async fn lookup_cep(&self, _cep: &Cep) -> Result<Option<Address>, LookupError> {
            Ok(self.0.clone())
        }
    }

    fn found() -> Address {
        Address {
            cep: Some("30160-011".parse().unwrap()),
            street: "Rua da Bahia".to_string(),
            number: String::new(),
            complement: None,
            neighborhood: "Centro".to_string(),
            city: "Belo Horizonte".to_string(),
            state: "MG".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fill_from_cep() {
        let mut form = AddressForm::default();
        form.update("cep", "30160011").unwrap();
        form.update("number", "1200").unwrap();

        assert!(form.fill_from_cep(&FakeCep(Some(found()))).await.unwrap());
        assert_eq!(form.cep, "30160-011");
        assert_eq!(form.city, "Belo Horizonte");
        assert_eq!(form.number, "1200");
        assert!(form.validate().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_cep_leaves_fields() {
        let mut form = AddressForm::default();
        form.update("cep", "99999-999").unwrap();
        form.update("city", "Caratinga").unwrap();

        assert!(!form.fill_from_cep(&FakeCep(None)).await.unwrap());
        assert_eq!(form.city, "Caratinga");
        assert!(form.street.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_cep_skips_lookup() {
        let mut form = AddressForm::default();
        form.update("cep", "123").unwrap();
        assert!(!form.fill_from_cep(&FakeCep(Some(found()))).await.unwrap());
        assert!(form.city.is_empty());
    }

    #[test]
    fn test_validate_reports_all_fields() {
        let mut form = AddressForm::default();
        form.update("cep", "12").unwrap();
        let fields: Vec<_> = form.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, ["cep", "street", "number", "neighborhood", "city", "state"]);
        assert!(matches!(
            form.update("zip", "x"),
            Err(FormError::UnknownField(_))
        ));
    }

    #[test]
    fn test_build_uppercases_state() {
        let mut form = AddressForm::default();
        form.load(&found());
        form.update("number", "10").unwrap();
        form.update("state", "mg").unwrap();
        assert_eq!(form.build().unwrap().state, "MG");
    }
}
