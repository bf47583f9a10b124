use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::lookup::{AddressLookup, CompanyLookup, LookupError};
use crate::types::{Document, EntityStatus, Generator};

use super::wizard::{Step, WizardForm};
use super::{
    AddressForm, AdministratorForm, EnergyAccountForm, FieldError, FormError, FormState,
    parse_decimal, parsed, required,
};

const PLANT: &[&str] = &[
    "nickname",
    "owner_name",
    "owner_document",
    "capacity_kwp",
    "expected_generation_kwh",
    "cep",
    "street",
    "number",
    "complement",
    "neighborhood",
    "city",
    "state",
];
const ADMIN: &[&str] = &["admin_name", "admin_document", "admin_email", "admin_phone"];
const ACCOUNT: &[&str] = &["uc", "concessionaria", "holder_name", "holder_document"];

const FIELDS: &[&str] = &[
    "nickname",
    "owner_name",
    "owner_document",
    "capacity_kwp",
    "expected_generation_kwh",
    "cep",
    "street",
    "number",
    "complement",
    "neighborhood",
    "city",
    "state",
    "admin_name",
    "admin_document",
    "admin_email",
    "admin_phone",
    "uc",
    "concessionaria",
    "holder_name",
    "holder_document",
];

const STEPS: &[Step] = &[
    Step {
        name: "plant",
        title: "Plant",
        fields: PLANT,
    },
    Step {
        name: "administrator",
        title: "Administrator",
        fields: ADMIN,
    },
    Step {
        name: "account",
        title: "Energy account",
        fields: ACCOUNT,
    },
];

/// Generator (plant) registration input.
///
/// The administrator block is optional; leave every `admin_*` field blank
/// to skip it.
#[derive(Debug, Clone, Default)]
pub struct GeneratorForm {
    pub nickname: String,
    pub owner_name: String,
    pub owner_document: String,
    pub capacity_kwp: String,
    pub expected_generation_kwh: String,
    pub address: AddressForm,
    pub administrator: AdministratorForm,
    pub account: EnergyAccountForm,
}

impl GeneratorForm {
    pub async fn fill_address(&mut self, lookup: &impl AddressLookup) -> Result<bool, LookupError> {
        self.address.fill_from_cep(lookup).await
    }

    /// Fill the owner from the CNPJ registry.
    ///
    /// Does nothing for CPF owners or unknown CNPJs. A blank nickname takes
    /// the trade name and a blank address takes the registered one.
    pub async fn fill_owner_from_cnpj(
        &mut self,
        lookup: &impl CompanyLookup,
    ) -> Result<bool, LookupError> {
        let Ok(document) = self.owner_document.parse::<Document>() else {
            return Ok(false);
        };
        if !document.is_company() {
            return Ok(false);
        }
        let Some(info) = lookup.lookup_cnpj(&document).await? else {
            return Ok(false);
        };

        if !info.is_active() {
            warn!(
                cnpj = %document,
                status = info.status.as_deref().unwrap_or_default(),
                "company is not active in the registry"
            );
        }

        self.owner_document = document.to_string();
        self.owner_name = info.legal_name;
        if self.nickname.trim().is_empty() {
            if let Some(trade_name) = info.trade_name {
                self.nickname = trade_name;
            }
        }
        if self.address.is_blank() {
            self.address.load(&info.address);
        }
        Ok(true)
    }

    fn account_with_defaults(&self) -> EnergyAccountForm {
        let mut account = self.account.clone();
        account.default_holder(&self.owner_name, &self.owner_document);
        account
    }

    pub fn build(&self) -> Result<Generator, FormError> {
        let mut errors = Vec::new();

        required(&mut errors, "nickname", &self.nickname, "Nickname");
        required(&mut errors, "owner_name", &self.owner_name, "Owner name");
        let owner_document = parsed::<Document>(&mut errors, "owner_document", &self.owner_document, true);

        let capacity_kwp = if self.capacity_kwp.trim().is_empty() {
            None
        } else {
            match parse_decimal(&self.capacity_kwp) {
                Ok(kwp) if kwp > 0.0 => Some(kwp),
                Ok(_) => {
                    errors.push(FieldError::new("capacity_kwp", "Capacity must be greater than zero"));
                    None
                }
                Err(e) => {
                    errors.push(FieldError::new("capacity_kwp", e));
                    None
                }
            }
        };

        let expected = match parse_decimal(&self.expected_generation_kwh) {
            Ok(kwh) if kwh >= 0.0 => Some(kwh),
            Ok(_) => {
                errors.push(FieldError::new(
                    "expected_generation_kwh",
                    "Expected generation cannot be negative",
                ));
                None
            }
            Err(_) if self.expected_generation_kwh.trim().is_empty() => {
                errors.push(FieldError::new(
                    "expected_generation_kwh",
                    "Expected monthly generation is required",
                ));
                None
            }
            Err(e) => {
                errors.push(FieldError::new("expected_generation_kwh", e));
                None
            }
        };

        let address = self
            .address
            .build()
            .map_err(|e| errors.extend_from_slice(e.field_errors()))
            .ok();

        let administrator = if self.administrator.is_blank() {
            None
        } else {
            match self.administrator.build() {
                Ok(admin) => Some(admin),
                Err(e) => {
                    errors.extend(e.field_errors().iter().cloned().map(|e| e.prefixed("admin_")));
                    None
                }
            }
        };

        let account = self
            .account_with_defaults()
            .build()
            .map_err(|e| errors.extend_from_slice(e.field_errors()))
            .ok();

        match (owner_document, expected, address, account) {
            (Some(owner_document), Some(expected_generation_kwh), Some(address), Some(account))
                if errors.is_empty() =>
            {
                Ok(Generator {
                    id: Uuid::new_v4(),
                    nickname: self.nickname.trim().to_string(),
                    owner_name: self.owner_name.trim().to_string(),
                    owner_document,
                    account,
                    address,
                    administrator,
                    capacity_kwp,
                    expected_generation_kwh,
                    status: EntityStatus::Active,
                    created_at: Utc::now(),
                })
            }
            _ => Err(FormError::Incomplete(errors)),
        }
    }
}

impl FormState for GeneratorForm {
    fn fields(&self) -> &'static [&'static str] {
        FIELDS
    }

    fn update(&mut self, field: &str, value: &str) -> Result<(), FormError> {
        if let Some(admin_field) = field.strip_prefix("admin_") {
            return self.administrator.update(admin_field, value);
        }
        if ACCOUNT.contains(&field) {
            return self.account.update(field, value);
        }
        if self.address.fields().contains(&field) {
            return self.address.update(field, value);
        }
        let slot = match field {
            "nickname" => &mut self.nickname,
            "owner_name" => &mut self.owner_name,
            "owner_document" => &mut self.owner_document,
            "capacity_kwp" => &mut self.capacity_kwp,
            "expected_generation_kwh" => &mut self.expected_generation_kwh,
            _ => return Err(FormError::UnknownField(field.to_string())),
        };
        *slot = value.trim().to_string();
        Ok(())
    }

    fn value(&self, field: &str) -> Option<&str> {
        if let Some(admin_field) = field.strip_prefix("admin_") {
            return self.administrator.value(admin_field);
        }
        if ACCOUNT.contains(&field) {
            return self.account.value(field);
        }
        if let Some(v) = self.address.value(field) {
            return Some(v);
        }
        match field {
            "nickname" => Some(&self.nickname),
            "owner_name" => Some(&self.owner_name),
            "owner_document" => Some(&self.owner_document),
            "capacity_kwp" => Some(&self.capacity_kwp),
            "expected_generation_kwh" => Some(&self.expected_generation_kwh),
            _ => None,
        }
    }

    fn validate(&self) -> Vec<FieldError> {
        match self.build() {
            Ok(_) => Vec::new(),
            Err(e) => e.field_errors().to_vec(),
        }
    }
}

impl WizardForm for GeneratorForm {
    fn steps() -> &'static [Step] {
        STEPS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::Wizard;
    use crate::lookup::CompanyInfo;
    use crate::types::Address;

    struct FakeRegistry {
        status: &'static str,
    }

    impl CompanyLookup for FakeRegistry {
        async fn lookup_cnpj(&self, cnpj: &Document) -> Result<Option<CompanyInfo>, LookupError> {
            Ok(Some(CompanyInfo {
                cnpj: cnpj.clone(),
                legal_name: "SOL NASCENTE ENERGIA LTDA".to_string(),
                trade_name: Some("Usina Sol Nascente".to_string()),
                status: Some(self.status.to_string()),
                address: Address {
                    cep: Some("30160-011".parse().unwrap()),
                    street: "RUA DA BAHIA".to_string(),
                    number: "1200".to_string(),
                    complement: None,
                    neighborhood: "CENTRO".to_string(),
                    city: "BELO HORIZONTE".to_string(),
                    state: "MG".to_string(),
                },
                email: None,
                phone: None,
            }))
        }
    }

    struct Unreachable;

    impl CompanyLookup for Unreachable {
        async fn lookup_cnpj(&self, _cnpj: &Document) -> Result<Option<CompanyInfo>, LookupError> {
            panic!("lookup should not be called");
        }
    }

    fn filled() -> GeneratorForm {
        let mut form = GeneratorForm::default();
        for (field, value) in [
            ("nickname", "Usina Norte"),
            ("owner_name", "Sol Nascente Energia Ltda"),
            ("owner_document", "11.222.333/0001-81"),
            ("expected_generation_kwh", "12000"),
            ("street", "Estrada Velha"),
            ("number", "s/n"),
            ("neighborhood", "Zona Rural"),
            ("city", "Janaúba"),
            ("state", "MG"),
            ("uc", "300012345"),
            ("concessionaria", "CEMIG"),
        ] {
            form.update(field, value).unwrap();
        }
        form
    }

    #[tokio::test]
    async fn test_fill_owner_from_cnpj() {
        let mut form = GeneratorForm::default();
        form.update("owner_document", "11222333000181").unwrap();

        assert!(form.fill_owner_from_cnpj(&FakeRegistry { status: "ATIVA" }).await.unwrap());
        assert_eq!(form.owner_name, "SOL NASCENTE ENERGIA LTDA");
        assert_eq!(form.nickname, "Usina Sol Nascente");
        assert_eq!(form.owner_document, "11.222.333/0001-81");
        assert_eq!(form.value("city"), Some("BELO HORIZONTE"));
    }

    #[tokio::test]
    async fn test_fill_owner_keeps_typed_address() {
        let mut form = filled();
        assert!(form.fill_owner_from_cnpj(&FakeRegistry { status: "BAIXADA" }).await.unwrap());
        assert_eq!(form.nickname, "Usina Norte");
        assert_eq!(form.value("city"), Some("Janaúba"));
    }

    #[tokio::test]
    async fn test_cpf_owner_skips_registry() {
        let mut form = GeneratorForm::default();
        form.update("owner_document", "529.982.247-25").unwrap();
        assert!(!form.fill_owner_from_cnpj(&Unreachable).await.unwrap());
    }

    #[test]
    fn test_build_without_administrator() {
        let generator = filled().build().unwrap();
        assert!(generator.administrator.is_none());
        assert_eq!(generator.expected_generation_kwh, 12000.0);
        assert_eq!(generator.account.holder_name, "Sol Nascente Energia Ltda");
        assert!(generator.is_active());
    }

    #[test]
    fn test_partial_administrator_errors_are_prefixed() {
        let mut form = filled();
        form.update("admin_name", "Gestora").unwrap();
        let fields: Vec<_> = form.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, ["admin_document"]);
    }

    #[test]
    fn test_wizard_steps() {
        let mut wizard = Wizard::new(filled());
        assert_eq!(wizard.position(), (1, 3));
        assert!(wizard.next().unwrap());
        assert_eq!(wizard.current_step().name, "administrator");

        wizard.form_mut().update("admin_email", "x").unwrap();
        assert!(wizard.next().is_err());
        wizard.form_mut().update("admin_email", "").unwrap();
        assert!(wizard.next().unwrap());
        assert!(wizard.is_last());
        assert!(!wizard.next().unwrap());
    }
}
