use chrono::Utc;
use uuid::Uuid;

use crate::lookup::{AddressLookup, LookupError};
use crate::types::{Document, EntityStatus, Fidelidade, Phone, Subscriber};

use super::wizard::{Step, WizardForm};
use super::{
    AddressForm, EnergyAccountForm, FieldError, FormError, FormState, is_plausible_email,
    optional, parse_decimal, parsed, required,
};

const PERSONAL: &[&str] = &["name", "document", "email", "phone"];
const PLAN: &[&str] = &[
    "consumption_kwh",
    "accumulated_credit_kwh",
    "fidelidade",
    "discount_pct",
    "representative_id",
];
const ADDRESS: &[&str] = &[
    "cep",
    "street",
    "number",
    "complement",
    "neighborhood",
    "city",
    "state",
];
const ACCOUNT: &[&str] = &["uc", "concessionaria", "holder_name", "holder_document"];

const FIELDS: &[&str] = &[
    "name",
    "document",
    "email",
    "phone",
    "cep",
    "street",
    "number",
    "complement",
    "neighborhood",
    "city",
    "state",
    "uc",
    "concessionaria",
    "holder_name",
    "holder_document",
    "consumption_kwh",
    "accumulated_credit_kwh",
    "fidelidade",
    "discount_pct",
    "representative_id",
];

const STEPS: &[Step] = &[
    Step {
        name: "personal",
        title: "Personal data",
        fields: PERSONAL,
    },
    Step {
        name: "address",
        title: "Address",
        fields: ADDRESS,
    },
    Step {
        name: "account",
        title: "Energy account",
        fields: ACCOUNT,
    },
    Step {
        name: "plan",
        title: "Plan",
        fields: PLAN,
    },
];

/// Subscriber registration input.
///
/// The account holder defaults to the subscriber. The discount defaults to
/// the fidelidade tier unless typed explicitly.
#[derive(Debug, Clone, Default)]
pub struct SubscriberForm {
    pub name: String,
    pub document: String,
    pub email: String,
    pub phone: String,
    pub address: AddressForm,
    pub account: EnergyAccountForm,
    pub consumption_kwh: String,
    pub accumulated_credit_kwh: String,
    pub fidelidade: String,
    pub discount_pct: String,
    pub representative_id: String,
}

impl SubscriberForm {
    /// Auto-fill the address from the typed CEP.
    pub async fn fill_address(&mut self, lookup: &impl AddressLookup) -> Result<bool, LookupError> {
        self.address.fill_from_cep(lookup).await
    }

    fn account_with_defaults(&self) -> EnergyAccountForm {
        let mut account = self.account.clone();
        account.default_holder(&self.name, &self.document);
        account
    }

    fn fidelidade(&self, errors: &mut Vec<FieldError>) -> Fidelidade {
        if self.fidelidade.trim().is_empty() {
            return Fidelidade::default();
        }
        parsed::<Fidelidade>(errors, "fidelidade", &self.fidelidade, false).unwrap_or_default()
    }

    fn decimal(errors: &mut Vec<FieldError>, field: &str, value: &str) -> Option<f64> {
        if value.trim().is_empty() {
            return None;
        }
        match parse_decimal(value) {
            Ok(v) => Some(v),
            Err(e) => {
                errors.push(FieldError::new(field, e));
                None
            }
        }
    }

    pub fn build(&self) -> Result<Subscriber, FormError> {
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

        let address = self.address.build().map_err(|e| errors.extend_from_slice(e.field_errors())).ok();
        let account = self
            .account_with_defaults()
            .build()
            .map_err(|e| errors.extend_from_slice(e.field_errors()))
            .ok();

        let consumption = Self::decimal(&mut errors, "consumption_kwh", &self.consumption_kwh);
        match consumption {
            None if self.consumption_kwh.trim().is_empty() => {
                errors.push(FieldError::new("consumption_kwh", "Average consumption is required"));
            }
            Some(kwh) if kwh <= 0.0 => {
                errors.push(FieldError::new("consumption_kwh", "Consumption must be greater than zero"));
            }
            Some(kwh) if kwh.fract() != 0.0 => {
                errors.push(FieldError::new("consumption_kwh", "Consumption is contracted in whole kWh"));
            }
            _ => {}
        }

        let credit = Self::decimal(&mut errors, "accumulated_credit_kwh", &self.accumulated_credit_kwh)
            .unwrap_or(0.0);
        if credit < 0.0 {
            errors.push(FieldError::new("accumulated_credit_kwh", "Credit cannot be negative"));
        }

        let fidelidade = self.fidelidade(&mut errors);
        let discount = Self::decimal(&mut errors, "discount_pct", &self.discount_pct)
            .unwrap_or_else(|| fidelidade.discount_pct());
        if !(0.0..=100.0).contains(&discount) {
            errors.push(FieldError::new("discount_pct", "Discount must be between 0% and 100%"));
        }

        let representative_id = parsed::<Uuid>(&mut errors, "representative_id", &self.representative_id, false);

        match (document, address, account, consumption) {
            (Some(document), Some(address), Some(account), Some(consumption_kwh))
                if errors.is_empty() =>
            {
                Ok(Subscriber {
                    id: Uuid::new_v4(),
                    name: self.name.trim().to_string(),
                    document,
                    email: email.map(|e| e.to_lowercase()),
                    phone,
                    address,
                    account,
                    consumption_kwh,
                    accumulated_credit_kwh: credit,
                    fidelidade,
                    discount_pct: discount,
                    representative_id,
                    status: EntityStatus::Active,
                    created_at: Utc::now(),
                })
            }
            _ => Err(FormError::Incomplete(errors)),
        }
    }
}

impl FormState for SubscriberForm {
    fn fields(&self) -> &'static [&'static str] {
        FIELDS
    }

    fn update(&mut self, field: &str, value: &str) -> Result<(), FormError> {
        if ADDRESS.contains(&field) {
            return self.address.update(field, value);
        }
        if ACCOUNT.contains(&field) {
            return self.account.update(field, value);
        }
        let slot = match field {
            "name" => &mut self.name,
            "document" => &mut self.document,
            "email" => &mut self.email,
            "phone" => &mut self.phone,
            "consumption_kwh" => &mut self.consumption_kwh,
            "accumulated_credit_kwh" => &mut self.accumulated_credit_kwh,
            "fidelidade" => &mut self.fidelidade,
            "discount_pct" => &mut self.discount_pct,
            "representative_id" => &mut self.representative_id,
            _ => return Err(FormError::UnknownField(field.to_string())),
        };
        *slot = value.trim().to_string();
        Ok(())
    }

    fn value(&self, field: &str) -> Option<&str> {
        if ADDRESS.contains(&field) {
            return self.address.value(field);
        }
        if ACCOUNT.contains(&field) {
            return self.account.value(field);
        }
        match field {
            "name" => Some(&self.name),
            "document" => Some(&self.document),
            "email" => Some(&self.email),
            "phone" => Some(&self.phone),
            "consumption_kwh" => Some(&self.consumption_kwh),
            "accumulated_credit_kwh" => Some(&self.accumulated_credit_kwh),
            "fidelidade" => Some(&self.fidelidade),
            "discount_pct" => Some(&self.discount_pct),
            "representative_id" => Some(&self.representative_id),
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

impl WizardForm for SubscriberForm {
    fn steps() -> &'static [Step] {
        STEPS
    }
}
