//! Local workspace service.
//!
//! Ties together:
//! 1. The SQLite record store
//! 2. Attachment storage
//! 3. Allocation and billing rules, checked before anything is written

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::allocation::{AllocationError, RateioDraft};
use crate::billing::{BillingError, InvoiceInput, check_transition, validate_invoice};
use crate::types::{
    AllocationKind, CommissionLine, DataError, EntityStatus, Generator, Invoice, InvoiceId,
    InvoiceStatus, Rateio, RateioId, ReferenceMonth, Representative, Subscriber, commission_cents,
    digits_only,
};

use super::LocalConfig;
use super::db::LocalDb;
use super::storage::{AttachmentKind, AttachmentStore};

/// Local workspace service.
pub struct Workspace {
    dir: PathBuf,
    db: LocalDb,
    attachments: AttachmentStore,
    config: LocalConfig,
}

impl Workspace {
    /// Open the workspace stored in `dir` (the `.rateio/` directory).
    pub async fn open(dir: &Path, config: LocalConfig) -> Result<Self> {
        let db = LocalDb::open(&dir.join("db.sqlite"))
            .await
            .context("Failed to open workspace database")?;
        let attachments = AttachmentStore::new(dir.join("attachments")).await?;

        Ok(Self {
            dir: dir.to_path_buf(),
            db,
            attachments,
            config,
        })
    }

    /// Open the workspace above the current directory with the user's config.
    pub async fn open_current() -> Result<Self> {
        let dir = super::get_workspace_dir().ok_or_else(|| {
            anyhow::anyhow!(
                "No {} workspace found. Run `rateio init` first.",
                super::WORKSPACE_DIR_NAME
            )
        })?;
        let config = LocalConfig::load()?;
        Self::open(&dir, config).await
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn db(&self) -> &LocalDb {
        &self.db
    }

    pub fn attachments(&self) -> &AttachmentStore {
        &self.attachments
    }

    pub fn config(&self) -> &LocalConfig {
        &self.config
    }

    // ==================== Subscribers ====================

    pub async fn register_subscriber(&self, subscriber: &Subscriber) -> Result<()> {
        if subscriber.consumption_kwh.fract() != 0.0 {
            bail!(
                "Consumption is contracted in whole kWh, got {}",
                subscriber.consumption_kwh
            );
        }
        if let Some(rep) = subscriber.representative_id {
            if self.db.get_representative(rep).await?.is_none() {
                return Err(DataError::NotFound(format!("representative {}", rep)).into());
            }
        }
        self.db.insert_subscriber(subscriber).await?;
        info!(name = %subscriber.name, uc = %subscriber.account.uc, "registered subscriber");
        Ok(())
    }

    /// Find a subscriber by id or UC number.
    pub async fn subscriber(&self, key: &str) -> Result<Subscriber> {
        let found = match Uuid::parse_str(key) {
            Ok(id) => self.db.get_subscriber(id).await?,
            Err(_) => self.db.find_subscriber_by_uc(&digits_only(key)).await?,
        };
        found.ok_or_else(|| DataError::NotFound(format!("subscriber {}", key)).into())
    }

    /// Delete a subscriber that never took part in a rateio or invoice.
    pub async fn remove_subscriber(&self, key: &str) -> Result<Subscriber> {
        let subscriber = self.subscriber(key).await?;
        self.db.delete_subscriber(subscriber.id).await?;
        info!(name = %subscriber.name, "removed subscriber");
        Ok(subscriber)
    }

    // ==================== Generators ====================

    pub async fn register_generator(&self, generator: &Generator) -> Result<()> {
        self.db.insert_generator(generator).await?;
        info!(nickname = %generator.nickname, uc = %generator.account.uc, "registered generator");
        Ok(())
    }

    /// Find a generator by id, UC number or nickname.
    pub async fn generator(&self, key: &str) -> Result<Generator> {
        if let Ok(id) = Uuid::parse_str(key) {
            return self
                .db
                .get_generator(id)
                .await?
                .ok_or_else(|| DataError::NotFound(format!("generator {}", key)).into());
        }

        let uc = digits_only(key);
        let mut matches: Vec<Generator> = self
            .db
            .list_generators()
            .await?
            .into_iter()
            .filter(|g| {
                (!uc.is_empty() && g.account.uc.as_str() == uc)
                    || g.nickname.eq_ignore_ascii_case(key.trim())
            })
            .collect();

        match matches.len() {
            0 => Err(DataError::NotFound(format!("generator {}", key)).into()),
            1 => Ok(matches.remove(0)),
            n => bail!("{} generators match '{}'; use the id instead", n, key),
        }
    }

    // ==================== Rateios ====================

    /// Start a draft for a generator using the configured tolerance.
    pub async fn start_rateio(
        &self,
        generator_key: &str,
        kind: AllocationKind,
        period: chrono::NaiveDate,
    ) -> Result<RateioDraft> {
        let generator = self.generator(generator_key).await?;
        let draft = RateioDraft::new(&generator, kind, period)?
            .with_tolerance(self.config.percentage_tolerance);
        Ok(draft)
    }

    /// Validate and persist a draft as a pending rateio.
    ///
    /// Participants are re-checked against the store, since a subscriber
    /// may have been deactivated while the draft was being edited.
    pub async fn save_rateio(&self, draft: &RateioDraft, attachment: Option<&Path>) -> Result<Rateio> {
        let generator = self
            .db
            .get_generator(draft.generator_id)
            .await?
            .ok_or_else(|| DataError::NotFound(format!("generator {}", draft.generator_id)))?;
        if !generator.is_active() {
            return Err(AllocationError::InactiveGenerator(generator.nickname).into());
        }

        for p in &draft.participants {
            let subscriber = self
                .db
                .get_subscriber(p.subscriber_id)
                .await?
                .ok_or_else(|| DataError::NotFound(format!("subscriber {}", p.name)))?;
            if subscriber.status == EntityStatus::Inactive {
                return Err(AllocationError::InactiveSubscriber(subscriber.name).into());
            }
        }

        let mut rateio = draft
            .clone()
            .with_tolerance(self.config.percentage_tolerance)
            .finalize()?;

        if let Some(path) = attachment {
            let key = self
                .attachments
                .put_file(AttachmentKind::Rateio, rateio.id, path)
                .await?;
            rateio.attachment = Some(key);
        }

        if let Err(e) = self.db.insert_rateio(&rateio).await {
            if rateio.attachment.is_some() {
                self.attachments
                    .delete_owner(AttachmentKind::Rateio, rateio.id)
                    .await?;
            }
            return Err(e.into());
        }

        info!(
            id = %rateio.id,
            generator = %generator.nickname,
            participants = rateio.participants.len(),
            "saved rateio"
        );
        Ok(rateio)
    }

    pub async fn rateio(&self, id: RateioId) -> Result<Rateio> {
        self.db
            .get_rateio(id)
            .await?
            .ok_or_else(|| DataError::NotFound(format!("rateio {}", id)).into())
    }

    /// Mark a pending rateio completed and carry its credits forward.
    pub async fn complete_rateio(&self, id: RateioId) -> Result<Rateio> {
        let rateio = self.db.complete_rateio(id).await?;
        info!(id = %id, "completed rateio");
        Ok(rateio)
    }

    // ==================== Invoices ====================

    /// Check an invoice against the billing rules and existing invoices.
    pub async fn check_invoice(&self, input: &InvoiceInput) -> Result<Vec<crate::billing::InvoiceIssue>> {
        let open = self
            .db
            .count_active_invoices(input.subscriber_id, input.reference)
            .await?;
        Ok(validate_invoice(input, open))
    }

    pub async fn create_invoice(&self, input: InvoiceInput, attachment: Option<&Path>) -> Result<Invoice> {
        let subscriber = self
            .db
            .get_subscriber(input.subscriber_id)
            .await?
            .ok_or_else(|| DataError::NotFound(format!("subscriber {}", input.subscriber_id)))?;
        if subscriber.status == EntityStatus::Inactive {
            return Err(BillingError::InactiveSubscriber(subscriber.name).into());
        }

        let issues = self.check_invoice(&input).await?;
        if !issues.is_empty() {
            return Err(BillingError::Invalid(issues).into());
        }

        let mut invoice = input.into_invoice();
        if let Some(path) = attachment {
            let key = self
                .attachments
                .put_file(AttachmentKind::Invoice, invoice.id, path)
                .await?;
            invoice.attachment = Some(key);
        }

        self.db.insert_invoice(&invoice).await?;
        info!(id = %invoice.id, subscriber = %subscriber.name, reference = %invoice.reference, "created invoice");
        Ok(invoice)
    }

    pub async fn invoice(&self, id: InvoiceId) -> Result<Invoice> {
        self.db
            .get_invoice(id)
            .await?
            .ok_or_else(|| DataError::NotFound(format!("invoice {}", id)).into())
    }

    pub async fn issue_invoice(&self, id: InvoiceId) -> Result<Invoice> {
        self.transition_invoice(id, InvoiceStatus::Issued).await
    }

    pub async fn pay_invoice(&self, id: InvoiceId) -> Result<Invoice> {
        self.transition_invoice(id, InvoiceStatus::Paid).await
    }

    pub async fn cancel_invoice(&self, id: InvoiceId) -> Result<Invoice> {
        self.transition_invoice(id, InvoiceStatus::Cancelled).await
    }

    async fn transition_invoice(&self, id: InvoiceId, to: InvoiceStatus) -> Result<Invoice> {
        let invoice = self.invoice(id).await?;
        check_transition(&invoice, to)?;

        let issued_at = (to == InvoiceStatus::Issued).then(Utc::now);
        self.db
            .transition_invoice(id, invoice.status, to, issued_at)
            .await?;

        info!(id = %id, from = %invoice.status, to = %to, "invoice status changed");
        self.invoice(id).await
    }

    // ==================== Representatives ====================

    pub async fn register_representative(&self, representative: &Representative) -> Result<()> {
        if !(0.0..=100.0).contains(&representative.commission_pct) {
            bail!("Commission must be between 0% and 100%");
        }
        self.db.insert_representative(representative).await?;
        info!(name = %representative.name, "registered representative");
        Ok(())
    }

    /// Find a representative by id or document.
    pub async fn representative(&self, key: &str) -> Result<Representative> {
        if let Ok(id) = Uuid::parse_str(key) {
            return self
                .db
                .get_representative(id)
                .await?
                .ok_or_else(|| DataError::NotFound(format!("representative {}", key)).into());
        }

        let digits = digits_only(key);
        self.db
            .list_representatives()
            .await?
            .into_iter()
            .find(|r| !digits.is_empty() && r.document.digits() == digits)
            .ok_or_else(|| DataError::NotFound(format!("representative {}", key)).into())
    }

    /// Commission owed to each representative for a month.
    pub async fn commission_report(&self, reference: ReferenceMonth) -> Result<Vec<CommissionLine>> {
        let rows = self.db.commission_rows(reference).await?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            let representative_id = match Uuid::parse_str(&row.representative_id) {
                Ok(id) => id,
                Err(e) => {
                    warn!(id = %row.representative_id, error = %e, "skipping corrupt representative row");
                    continue;
                }
            };
            lines.push(CommissionLine {
                representative_id,
                representative_name: row.representative_name,
                reference,
                paid_invoices: u32::try_from(row.paid_invoices).unwrap_or(u32::MAX),
                billed_cents: row.billed_cents,
                commission_cents: commission_cents(row.billed_cents, row.commission_pct),
            });
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::ShareField;
    use crate::billing::InvoiceIssue;
    use crate::types::{Address, EnergyAccount, Fidelidade, RateioStatus};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    async fn workspace(dir: &tempfile::TempDir) -> Workspace {
        Workspace::open(dir.path(), LocalConfig::default()).await.unwrap()
    }

    fn account(uc: &str, holder: &str) -> EnergyAccount {
        EnergyAccount {
            uc: uc.parse().unwrap(),
            concessionaria: "CEMIG".to_string(),
            holder_name: holder.to_string(),
            holder_document: "529.982.247-25".parse().unwrap(),
        }
    }

    fn subscriber(name: &str, uc: &str, consumption: f64, credit: f64) -> Subscriber {
        Subscriber {
            id: Uuid::new_v4(),
            name: name.to_string(),
            document: "529.982.247-25".parse().unwrap(),
            email: None,
            phone: None,
            address: Address::default(),
            account: account(uc, name),
            consumption_kwh: consumption,
            accumulated_credit_kwh: credit,
            fidelidade: Fidelidade::None,
            discount_pct: 10.0,
            representative_id: None,
            status: EntityStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn generator(expected: f64) -> Generator {
        Generator {
            id: Uuid::new_v4(),
            nickname: "Usina Norte".to_string(),
            owner_name: "Sol Nascente Energia Ltda".to_string(),
            owner_document: "11.222.333/0001-81".parse().unwrap(),
            account: account("300012345", "Sol Nascente Energia Ltda"),
            address: Address::default(),
            administrator: None,
            capacity_kwp: None,
            expected_generation_kwh: expected,
            status: EntityStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn period() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn march() -> ReferenceMonth {
        ReferenceMonth::new(2024, 3).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_by_uc_and_nickname() {
        let dir = tempdir().unwrap();
        let ws = workspace(&dir).await;

        let g = generator(1000.0);
        let s = subscriber("Ana", "700000001", 300.0, 0.0);
        ws.register_generator(&g).await.unwrap();
        ws.register_subscriber(&s).await.unwrap();

        assert_eq!(ws.generator("usina norte").await.unwrap().id, g.id);
        assert_eq!(ws.generator("300012345").await.unwrap().id, g.id);
        assert_eq!(ws.subscriber("700.000.001").await.unwrap().id, s.id);
        assert_eq!(ws.subscriber(&s.id.to_string()).await.unwrap().name, "Ana");

        let err = ws.subscriber("999999999").await.unwrap_err();
        assert!(matches!(err.downcast_ref::<DataError>(), Some(DataError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fractional_consumption_rejected() {
        let dir = tempdir().unwrap();
        let ws = workspace(&dir).await;

        let s = subscriber("Ana", "700000001", 300.6, 0.0);
        assert!(ws.register_subscriber(&s).await.is_err());
        assert!(ws.db().list_subscribers(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_representative_rejected() {
        let dir = tempdir().unwrap();
        let ws = workspace(&dir).await;

        let mut s = subscriber("Ana", "700000001", 300.0, 0.0);
        s.representative_id = Some(Uuid::new_v4());
        assert!(ws.register_subscriber(&s).await.is_err());
    }

    #[tokio::test]
    async fn test_save_and_complete_rateio() {
        let dir = tempdir().unwrap();
        let ws = workspace(&dir).await;

        let g = generator(1000.0);
        let a = subscriber("Ana", "700000001", 600.0, 50.0);
        let b = subscriber("Bruno", "700000002", 400.0, 0.0);
        ws.register_generator(&g).await.unwrap();
        ws.register_subscriber(&a).await.unwrap();
        ws.register_subscriber(&b).await.unwrap();

        let mut draft = ws
            .start_rateio("Usina Norte", AllocationKind::Percentage, period())
            .await
            .unwrap();
        draft.add_participant(&a).unwrap();
        draft.add_participant(&b).unwrap();
        draft.update_subscriber_value(0, ShareField::Percentage, 60.0).unwrap();
        draft.update_subscriber_value(1, ShareField::Percentage, 40.0).unwrap();

        let attachment = dir.path().join("rateio.pdf");
        std::fs::write(&attachment, b"%PDF").unwrap();

        let saved = ws.save_rateio(&draft, Some(&attachment)).await.unwrap();
        assert_eq!(saved.status, RateioStatus::Pending);
        assert_eq!(saved.participants[0].allocated_kwh, 600.0);
        let key = saved.attachment.clone().unwrap();
        assert!(ws.attachments().exists(&key).await);

        let loaded = ws.rateio(saved.id).await.unwrap();
        assert_eq!(loaded.participants.len(), 2);

        ws.complete_rateio(saved.id).await.unwrap();
        let ana = ws.subscriber("700000001").await.unwrap();
        assert_eq!(ana.accumulated_credit_kwh, 0.0);
        assert!(ws.complete_rateio(saved.id).await.is_err());
    }

    #[tokio::test]
    async fn test_saved_priority_rateio_follows_ranks() {
        let dir = tempdir().unwrap();
        let ws = workspace(&dir).await;

        let g = generator(600.0);
        let a = subscriber("Ana", "700000001", 300.0, 0.0);
        let b = subscriber("Bruno", "700000002", 500.0, 0.0);
        ws.register_generator(&g).await.unwrap();
        ws.register_subscriber(&a).await.unwrap();
        ws.register_subscriber(&b).await.unwrap();

        let mut draft = ws
            .start_rateio("Usina Norte", AllocationKind::Priority, period())
            .await
            .unwrap();
        draft.add_participant(&a).unwrap();
        draft.add_participant(&b).unwrap();
        draft.update_subscriber_value(0, ShareField::Priority, 2.0).unwrap();
        draft.update_subscriber_value(1, ShareField::Priority, 1.0).unwrap();

        let saved = ws.save_rateio(&draft, None).await.unwrap();
        let loaded = ws.rateio(saved.id).await.unwrap();
        let allocated: Vec<_> = loaded
            .participants
            .iter()
            .map(|p| (p.name.as_str(), p.allocated_kwh))
            .collect();
        assert_eq!(allocated, vec![("Ana", 100.0), ("Bruno", 500.0)]);
    }

    #[tokio::test]
    async fn test_saved_percentage_rateio_within_generation() {
        let dir = tempdir().unwrap();
        let ws = workspace(&dir).await;

        let g = generator(1001.0);
        let a = subscriber("Ana", "700000001", 600.0, 0.0);
        let b = subscriber("Bruno", "700000002", 600.0, 0.0);
        ws.register_generator(&g).await.unwrap();
        ws.register_subscriber(&a).await.unwrap();
        ws.register_subscriber(&b).await.unwrap();

        let mut draft = ws
            .start_rateio("Usina Norte", AllocationKind::Percentage, period())
            .await
            .unwrap();
        draft.add_participant(&a).unwrap();
        draft.add_participant(&b).unwrap();
        draft.update_subscriber_value(0, ShareField::Percentage, 50.0).unwrap();
        draft.update_subscriber_value(1, ShareField::Percentage, 50.0).unwrap();

        let saved = ws.save_rateio(&draft, None).await.unwrap();
        let loaded = ws.rateio(saved.id).await.unwrap();
        assert_eq!(loaded.total_allocated_kwh(), 1001.0);
        assert!(loaded.total_allocated_kwh() <= loaded.expected_generation_kwh);
    }

    #[tokio::test]
    async fn test_invalid_draft_not_saved() {
        let dir = tempdir().unwrap();
        let ws = workspace(&dir).await;

        let g = generator(1000.0);
        let a = subscriber("Ana", "700000001", 600.0, 0.0);
        let b = subscriber("Bruno", "700000002", 400.0, 0.0);
        ws.register_generator(&g).await.unwrap();
        ws.register_subscriber(&a).await.unwrap();
        ws.register_subscriber(&b).await.unwrap();

        let mut draft = ws
            .start_rateio(&g.id.to_string(), AllocationKind::Percentage, period())
            .await
            .unwrap();
        draft.add_participant(&a).unwrap();
        draft.add_participant(&b).unwrap();
        draft.update_subscriber_value(0, ShareField::Percentage, 60.0).unwrap();
        draft.update_subscriber_value(1, ShareField::Percentage, 30.0).unwrap();

        let err = ws.save_rateio(&draft, None).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AllocationError>(),
            Some(AllocationError::Invalid(_))
        ));
        assert!(ws.db().list_rateios(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deactivated_participant_blocks_save() {
        let dir = tempdir().unwrap();
        let ws = workspace(&dir).await;

        let g = generator(1000.0);
        let a = subscriber("Ana", "700000001", 600.0, 0.0);
        ws.register_generator(&g).await.unwrap();
        ws.register_subscriber(&a).await.unwrap();

        let mut draft = ws
            .start_rateio("Usina Norte", AllocationKind::Priority, period())
            .await
            .unwrap();
        draft.add_participant(&a).unwrap();
        ws.db()
            .set_subscriber_status(a.id, EntityStatus::Inactive)
            .await
            .unwrap();

        let err = ws.save_rateio(&draft, None).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AllocationError>(),
            Some(AllocationError::InactiveSubscriber(_))
        ));
    }

    #[tokio::test]
    async fn test_invoice_lifecycle() {
        let dir = tempdir().unwrap();
        let ws = workspace(&dir).await;

        let s = subscriber("Ana", "700000001", 300.0, 0.0);
        ws.register_subscriber(&s).await.unwrap();

        let due = NaiveDate::from_ymd_opt(2024, 4, 10).unwrap();
        let mut input = InvoiceInput::for_subscriber(&s, march(), 0.8, due);
        input.compensated_kwh = 250.0;

        let invoice = ws.create_invoice(input.clone(), None).await.unwrap();
        assert_eq!(invoice.amount_cents, 18000);

        let issues = ws.check_invoice(&input).await.unwrap();
        assert_eq!(issues, vec![InvoiceIssue::Duplicate { reference: march() }]);
        assert!(ws.create_invoice(input.clone(), None).await.is_err());

        assert!(ws.pay_invoice(invoice.id).await.is_err());
        let issued = ws.issue_invoice(invoice.id).await.unwrap();
        assert!(issued.issued_at.is_some());
        let paid = ws.pay_invoice(invoice.id).await.unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);

        let err = ws.cancel_invoice(invoice.id).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BillingError>(),
            Some(BillingError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancelled_invoice_frees_month() {
        let dir = tempdir().unwrap();
        let ws = workspace(&dir).await;

        let s = subscriber("Ana", "700000001", 300.0, 0.0);
        ws.register_subscriber(&s).await.unwrap();

        let due = NaiveDate::from_ymd_opt(2024, 4, 10).unwrap();
        let input = InvoiceInput::for_subscriber(&s, march(), 0.8, due);

        let first = ws.create_invoice(input.clone(), None).await.unwrap();
        ws.cancel_invoice(first.id).await.unwrap();
        assert!(ws.create_invoice(input, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_commission_report() {
        let dir = tempdir().unwrap();
        let ws = workspace(&dir).await;

        let rep = Representative {
            id: Uuid::new_v4(),
            name: "Carlos".to_string(),
            document: "529.982.247-25".parse().unwrap(),
            email: None,
            phone: None,
            commission_pct: 5.0,
            created_at: Utc::now(),
        };
        ws.register_representative(&rep).await.unwrap();
        assert_eq!(ws.representative("529.982.247-25").await.unwrap().id, rep.id);

        let mut a = subscriber("Ana", "700000001", 300.0, 0.0);
        a.representative_id = Some(rep.id);
        let mut b = subscriber("Bruno", "700000002", 300.0, 0.0);
        b.representative_id = Some(rep.id);
        ws.register_subscriber(&a).await.unwrap();
        ws.register_subscriber(&b).await.unwrap();

        let due = NaiveDate::from_ymd_opt(2024, 4, 10).unwrap();
        for s in [&a, &b] {
            let mut input = InvoiceInput::for_subscriber(s, march(), 0.8, due);
            input.compensated_kwh = 250.0;
            let invoice = ws.create_invoice(input, None).await.unwrap();
            ws.issue_invoice(invoice.id).await.unwrap();
            if s.id == a.id {
                ws.pay_invoice(invoice.id).await.unwrap();
            }
        }

        let lines = ws.commission_report(march()).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].paid_invoices, 1);
        assert_eq!(lines[0].billed_cents, 18000);
        assert_eq!(lines[0].commission_cents, 900);
    }
}
