use crate::types::{Administrator, Document, EnergyAccount, Phone, UcCode};

use super::{FieldError, FormError, FormState, is_plausible_email, optional, parsed, required};

const ACCOUNT_FIELDS: &[&str] = &["uc", "concessionaria", "holder_name", "holder_document"];

/// Utility account input.
#[derive(Debug, Clone, Default)]
pub struct EnergyAccountForm {
    pub uc: String,
    pub concessionaria: String,
    pub holder_name: String,
    pub holder_document: String,
}

impl EnergyAccountForm {
    /// Use the given holder when none was typed.
    pub fn default_holder(&mut self, name: &str, document: &str) {
        if self.holder_name.trim().is_empty() {
            self.holder_name = name.trim().to_string();
        }
        if self.holder_document.trim().is_empty() {
            self.holder_document = document.trim().to_string();
        }
    }

    pub fn build(&self) -> Result<EnergyAccount, FormError> {
        let mut errors = Vec::new();
        let uc = parsed::<UcCode>(&mut errors, "uc", &self.uc, true);
        let holder_document = parsed::<Document>(&mut errors, "holder_document", &self.holder_document, true);
        required(&mut errors, "concessionaria", &self.concessionaria, "Utility");
        required(&mut errors, "holder_name", &self.holder_name, "Account holder");

        match (uc, holder_document) {
            (Some(uc), Some(holder_document)) if errors.is_empty() => Ok(EnergyAccount {
                uc,
                concessionaria: self.concessionaria.trim().to_uppercase(),
                holder_name: self.holder_name.trim().to_string(),
                holder_document,
            }),
            _ => Err(FormError::Incomplete(errors)),
        }
    }
}

impl FormState for EnergyAccountForm {
    fn fields(&self) -> &'static [&'static str] {
        ACCOUNT_FIELDS
    }

    fn update(&mut self, field: &str, value: &str) -> Result<(), FormError> {
        let slot = match field {
            "uc" => &mut self.uc,
            "concessionaria" => &mut self.concessionaria,
            "holder_name" => &mut self.holder_name,
            "holder_document" => &mut self.holder_document,
            _ => return Err(FormError::UnknownField(field.to_string())),
        };
        *slot = value.trim().to_string();
        Ok(())
    }

    fn value(&self, field: &str) -> Option<&str> {
        match field {
            "uc" => Some(&self.uc),
            "concessionaria" => Some(&self.concessionaria),
            "holder_name" => Some(&self.holder_name),
            "holder_document" => Some(&self.holder_document),
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

const ADMIN_FIELDS: &[&str] = &["name", "document", "email", "phone"];

/// Input for the company or person operating a plant.
#[derive(Debug, Clone, Default)]
pub struct AdministratorForm {
    pub name: String,
    pub document: String,
    pub email: String,
    pub phone: String,
}

impl AdministratorForm {
    pub fn is_blank(&self) -> bool {
        ADMIN_FIELDS.iter().all(|f| self.value(f).is_none_or(|v| v.trim().is_empty()))
    }

    pub fn build(&self) -> Result<Administrator, FormError> {
        let mut errors = Vec::new();
        required(&mut errors, "name", &self.name, "Name");
        let document = parsed::<Document>(&mut errors, "document", &self.document, true);
        let phone = parsed::<Phone>(&mut errors, "phone", &self.phone, false);
        let email = optional(&self.email);
        if let Some(email) = &email {
            if !is_plausible_email(email) {
                errors.push(FieldError::new("email", "Invalid e-mail address"));
            }
        }

        match document {
            Some(document) if errors.is_empty() => Ok(Administrator {
                name: self.name.trim().to_string(),
                document,
                email: email.map(|e| e.to_lowercase()),
                phone,
            }),
            _ => Err(FormError::Incomplete(errors)),
        }
    }
}

impl FormState for AdministratorForm {
    fn fields(&self) -> &'static [&'static str] {
        ADMIN_FIELDS
    }

    fn update(&mut self, field: &str, value: &str) -> Result<(), FormError> {
        let slot = match field {
            "name" => &mut self.name,
            "document" => &mut self.document,
            "email" => &mut self.email,
            "phone" => &mut self.phone,
            _ => return Err(FormError::UnknownField(field.to_string())),
        };
        *slot = value.trim().to_string();
        Ok(())
    }

    fn value(&self, field: &str) -> Option<&str> {
        match field {
            "name" => Some(&self.name),
            "document" => Some(&self.document),
            "email" => Some(&self.email),
            "phone" => Some(&self.phone),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_build() {
        let mut form = EnergyAccountForm::default();
        form.update("uc", "3000.1234-5").unwrap();
        form.update("concessionaria", "cemig").unwrap();
        form.default_holder("Maria Souza", "529.982.247-25");

        let account = form.build().unwrap();
        assert_eq!(account.uc.as_str(), "300012345");
        assert_eq!(account.concessionaria, "CEMIG");
        assert_eq!(account.holder_name, "Maria Souza");
    }

    #[test]
    fn test_default_holder_keeps_typed_values() {
        let mut form = EnergyAccountForm::default();
        form.update("holder_name", "João").unwrap();
        form.default_holder("Maria", "529.982.247-25");
        assert_eq!(form.holder_name, "João");
        assert_eq!(form.holder_document, "529.982.247-25");
    }

    #[test]
    fn test_account_errors() {
        let mut form = EnergyAccountForm::default();
        form.update("uc", "12").unwrap();
        form.update("holder_document", "111.111.111-11").unwrap();
        let fields: Vec<_> = form.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, ["uc", "holder_document", "concessionaria", "holder_name"]);
    }

    #[test]
    fn test_administrator() {
        let mut form = AdministratorForm::default();
        assert!(form.is_blank());

        form.update("name", "Gestora Solar").unwrap();
        form.update("document", "11222333000181").unwrap();
        form.update("email", "nope").unwrap();
        assert_eq!(form.validate(), vec![FieldError::new("email", "Invalid e-mail address")]);

        form.update("email", "Contato@Gestora.com").unwrap();
        form.update("phone", "(31) 3222-1111").unwrap();
        let admin = form.build().unwrap();
        assert!(admin.document.is_company());
        assert_eq!(admin.email.as_deref(), Some("contato@gestora.com"));
    }
}
