//! SQLite database operations for the local workspace.

use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::debug;

use crate::types::{
    DataError, EntityStatus, Generator, GeneratorId, Invoice, InvoiceId, InvoiceStatus, Rateio,
    RateioId, RateioStatus, ReferenceMonth, Representative, RepresentativeId, Subscriber,
    SubscriberId,
};

use super::models::{
    CommissionRow, GeneratorRow, InvoiceRow, ParticipantRow, RateioRow, RepresentativeRow,
    SubscriberRow,
};

type Result<T> = std::result::Result<T, DataError>;

/// Local SQLite database.
pub struct LocalDb {
    pool: SqlitePool,
}

impl LocalDb {
    /// Open or create the database at the given path.
    pub async fn open(db_path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Run database migrations.
    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS representatives (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                document TEXT NOT NULL UNIQUE,
                email TEXT,
                phone TEXT,
                commission_pct REAL NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subscribers (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                document TEXT NOT NULL,
                email TEXT,
                phone TEXT,
                cep TEXT,
                street TEXT NOT NULL,
                number TEXT NOT NULL,
                complement TEXT,
                neighborhood TEXT NOT NULL,
                city TEXT NOT NULL,
                state TEXT NOT NULL,
                uc TEXT NOT NULL UNIQUE,
                concessionaria TEXT NOT NULL,
                holder_name TEXT NOT NULL,
                holder_document TEXT NOT NULL,
                consumption_kwh REAL NOT NULL,
                accumulated_credit_kwh REAL NOT NULL DEFAULT 0,
                fidelidade TEXT NOT NULL,
                discount_pct REAL NOT NULL,
                representative_id TEXT,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (representative_id) REFERENCES representatives(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS generators (
                id TEXT PRIMARY KEY,
                nickname TEXT NOT NULL,
                owner_name TEXT NOT NULL,
                owner_document TEXT NOT NULL,
                uc TEXT NOT NULL UNIQUE,
                concessionaria TEXT NOT NULL,
                holder_name TEXT NOT NULL,
                holder_document TEXT NOT NULL,
                cep TEXT,
                street TEXT NOT NULL,
                number TEXT NOT NULL,
                complement TEXT,
                neighborhood TEXT NOT NULL,
                city TEXT NOT NULL,
                state TEXT NOT NULL,
                admin_name TEXT,
                admin_document TEXT,
                admin_email TEXT,
                admin_phone TEXT,
                capacity_kwp REAL,
                expected_generation_kwh REAL NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rateios (
                id TEXT PRIMARY KEY,
                generator_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                period TEXT NOT NULL,
                expected_generation_kwh REAL NOT NULL,
                unallocated_kwh REAL NOT NULL,
                notes TEXT,
                attachment TEXT,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (generator_id) REFERENCES generators(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rateio_participants (
                rateio_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                subscriber_id TEXT NOT NULL,
                name TEXT NOT NULL,
                uc TEXT NOT NULL,
                consumption_kwh REAL NOT NULL,
                accumulated_credit_kwh REAL NOT NULL,
                percentage REAL,
                priority INTEGER,
                allocated_kwh REAL NOT NULL,
                credit_used_kwh REAL NOT NULL,
                remaining_credit_kwh REAL NOT NULL,
                PRIMARY KEY (rateio_id, position),
                FOREIGN KEY (rateio_id) REFERENCES rateios(id) ON DELETE CASCADE,
                FOREIGN KEY (subscriber_id) REFERENCES subscribers(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS invoices (
                id TEXT PRIMARY KEY,
                subscriber_id TEXT NOT NULL,
                reference TEXT NOT NULL,
                consumption_kwh REAL NOT NULL,
                compensated_kwh REAL NOT NULL,
                tariff REAL NOT NULL,
                discount_pct REAL NOT NULL,
                amount_cents INTEGER NOT NULL,
                due_date TEXT NOT NULL,
                status TEXT NOT NULL,
                attachment TEXT,
                issued_at TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (subscriber_id) REFERENCES subscribers(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_rateios_generator ON rateios(generator_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_participants_subscriber ON rateio_participants(subscriber_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_invoices_subscriber ON invoices(subscriber_id, reference)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ==================== Subscriber Operations ====================

    pub async fn insert_subscriber(&self, s: &Subscriber) -> Result<()> {
        let taken: Option<String> = sqlx::query_scalar("SELECT id FROM subscribers WHERE uc = ?")
            .bind(s.account.uc.as_str())
            .fetch_optional(&self.pool)
            .await?;
        if taken.is_some() {
            return Err(DataError::Conflict(format!(
                "UC {} is already registered",
                s.account.uc
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO subscribers (
                id, name, document, email, phone,
                cep, street, number, complement, neighborhood, city, state,
                uc, concessionaria, holder_name, holder_document,
                consumption_kwh, accumulated_credit_kwh, fidelidade, discount_pct,
                representative_id, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(s.id.to_string())
        .bind(&s.name)
        .bind(s.document.digits())
        .bind(&s.email)
        .bind(s.phone.clone().map(String::from))
        .bind(s.address.cep.as_ref().map(|c| c.digits().to_string()))
        .bind(&s.address.street)
        .bind(&s.address.number)
        .bind(&s.address.complement)
        .bind(&s.address.neighborhood)
        .bind(&s.address.city)
        .bind(&s.address.state)
        .bind(s.account.uc.as_str())
        .bind(&s.account.concessionaria)
        .bind(&s.account.holder_name)
        .bind(s.account.holder_document.digits())
        .bind(s.consumption_kwh)
        .bind(s.accumulated_credit_kwh)
        .bind(s.fidelidade.as_str())
        .bind(s.discount_pct)
        .bind(s.representative_id.map(|id| id.to_string()))
        .bind(s.status.as_str())
        .bind(s.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(id = %s.id, uc = %s.account.uc, "inserted subscriber");
        Ok(())
    }

    pub async fn get_subscriber(&self, id: SubscriberId) -> Result<Option<Subscriber>> {
        let row = sqlx::query_as::<_, SubscriberRow>("SELECT * FROM subscribers WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Subscriber::try_from).transpose()
    }

    pub async fn find_subscriber_by_uc(&self, uc: &str) -> Result<Option<Subscriber>> {
        let row = sqlx::query_as::<_, SubscriberRow>("SELECT * FROM subscribers WHERE uc = ?")
            .bind(uc)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Subscriber::try_from).transpose()
    }

    /// List subscribers, optionally only those with the given status.
    pub async fn list_subscribers(&self, status: Option<EntityStatus>) -> Result<Vec<Subscriber>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, SubscriberRow>(
                    "SELECT * FROM subscribers WHERE status = ? ORDER BY name",
                )
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, SubscriberRow>("SELECT * FROM subscribers ORDER BY name")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(Subscriber::try_from).collect()
    }

    pub async fn list_subscribers_by_representative(
        &self,
        representative_id: RepresentativeId,
    ) -> Result<Vec<Subscriber>> {
        let rows = sqlx::query_as::<_, SubscriberRow>(
            "SELECT * FROM subscribers WHERE representative_id = ? ORDER BY name",
        )
        .bind(representative_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Subscriber::try_from).collect()
    }

    pub async fn set_subscriber_status(&self, id: SubscriberId, status: EntityStatus) -> Result<()> {
        let result = sqlx::query("UPDATE subscribers SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!("subscriber {}", id)));
        }
        Ok(())
    }

    /// Delete a subscriber that has no rateio or invoice history.
    pub async fn delete_subscriber(&self, id: SubscriberId) -> Result<()> {
        let in_rateios: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM rateio_participants WHERE subscriber_id = ?",
        )
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await?;

        let invoices: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE subscriber_id = ?")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await?;

        if in_rateios > 0 || invoices > 0 {
            return Err(DataError::Conflict(format!(
                "subscriber {} has {} rateio entries and {} invoices; deactivate it instead",
                id, in_rateios, invoices
            )));
        }

        let result = sqlx::query("DELETE FROM subscribers WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!("subscriber {}", id)));
        }
        Ok(())
    }

    // ==================== Generator Operations ====================

    pub async fn insert_generator(&self, g: &Generator) -> Result<()> {
        let taken: Option<String> = sqlx::query_scalar("SELECT id FROM generators WHERE uc = ?")
            .bind(g.account.uc.as_str())
            .fetch_optional(&self.pool)
            .await?;
        if taken.is_some() {
            return Err(DataError::Conflict(format!(
                "UC {} is already registered as a generator",
                g.account.uc
            )));
        }

        let admin = g.administrator.as_ref();
        sqlx::query(
            r#"
            INSERT INTO generators (
                id, nickname, owner_name, owner_document,
                uc, concessionaria, holder_name, holder_document,
                cep, street, number, complement, neighborhood, city, state,
                admin_name, admin_document, admin_email, admin_phone,
                capacity_kwp, expected_generation_kwh, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(g.id.to_string())
        .bind(&g.nickname)
        .bind(&g.owner_name)
        .bind(g.owner_document.digits())
        .bind(g.account.uc.as_str())
        .bind(&g.account.concessionaria)
        .bind(&g.account.holder_name)
        .bind(g.account.holder_document.digits())
        .bind(g.address.cep.as_ref().map(|c| c.digits().to_string()))
        .bind(&g.address.street)
        .bind(&g.address.number)
        .bind(&g.address.complement)
        .bind(&g.address.neighborhood)
        .bind(&g.address.city)
        .bind(&g.address.state)
        .bind(admin.map(|a| a.name.clone()))
        .bind(admin.map(|a| a.document.digits().to_string()))
        .bind(admin.and_then(|a| a.email.clone()))
        .bind(admin.and_then(|a| a.phone.clone()).map(String::from))
        .bind(g.capacity_kwp)
        .bind(g.expected_generation_kwh)
        .bind(g.status.as_str())
        .bind(g.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(id = %g.id, uc = %g.account.uc, "inserted generator");
        Ok(())
    }

    pub async fn get_generator(&self, id: GeneratorId) -> Result<Option<Generator>> {
        let row = sqlx::query_as::<_, GeneratorRow>("SELECT * FROM generators WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Generator::try_from).transpose()
    }

    pub async fn list_generators(&self) -> Result<Vec<Generator>> {
        let rows = sqlx::query_as::<_, GeneratorRow>("SELECT * FROM generators ORDER BY nickname")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Generator::try_from).collect()
    }

    /// Record a new projected monthly generation for a plant.
    pub async fn update_expected_generation(&self, id: GeneratorId, kwh: f64) -> Result<()> {
        let result = sqlx::query("UPDATE generators SET expected_generation_kwh = ? WHERE id = ?")
            .bind(kwh)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!("generator {}", id)));
        }
        Ok(())
    }

    pub async fn set_generator_status(&self, id: GeneratorId, status: EntityStatus) -> Result<()> {
        let result = sqlx::query("UPDATE generators SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!("generator {}", id)));
        }
        Ok(())
    }

    // ==================== Rateio Operations ====================

    /// Insert a rateio and its participants in one transaction.
    pub async fn insert_rateio(&self, r: &Rateio) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO rateios (
                id, generator_id, kind, period, expected_generation_kwh,
                unallocated_kwh, notes, attachment, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(r.id.to_string())
        .bind(r.generator_id.to_string())
        .bind(r.kind.as_str())
        .bind(r.period.format("%Y-%m-%d").to_string())
        .bind(r.expected_generation_kwh)
        .bind(r.unallocated_kwh)
        .bind(&r.notes)
        .bind(&r.attachment)
        .bind(r.status.as_str())
        .bind(r.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for (position, p) in r.participants.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO rateio_participants (
                    rateio_id, position, subscriber_id, name, uc,
                    consumption_kwh, accumulated_credit_kwh, percentage, priority,
                    allocated_kwh, credit_used_kwh, remaining_credit_kwh
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(r.id.to_string())
            .bind(position as i64)
            .bind(p.subscriber_id.to_string())
            .bind(&p.name)
            .bind(p.uc.as_str())
            .bind(p.consumption_kwh)
            .bind(p.accumulated_credit_kwh)
            .bind(p.percentage)
            .bind(p.priority.map(i64::from))
            .bind(p.allocated_kwh)
            .bind(p.credit_used_kwh)
            .bind(p.remaining_credit_kwh)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(id = %r.id, participants = r.participants.len(), "inserted rateio");
        Ok(())
    }

    pub async fn get_rateio(&self, id: RateioId) -> Result<Option<Rateio>> {
        let row = sqlx::query_as::<_, RateioRow>("SELECT * FROM rateios WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let participants = self.participant_rows(&row.id).await?;
                Ok(Some(row.into_rateio(participants)?))
            }
            None => Ok(None),
        }
    }

    /// Rateio history, newest period first.
    pub async fn list_rateios(&self, generator: Option<GeneratorId>) -> Result<Vec<Rateio>> {
        let rows = match generator {
            Some(id) => {
                sqlx::query_as::<_, RateioRow>(
                    "SELECT * FROM rateios WHERE generator_id = ? ORDER BY period DESC, created_at DESC",
                )
                .bind(id.to_string())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, RateioRow>(
                    "SELECT * FROM rateios ORDER BY period DESC, created_at DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut rateios = Vec::with_capacity(rows.len());
        for row in rows {
            let participants = self.participant_rows(&row.id).await?;
            rateios.push(row.into_rateio(participants)?);
        }
        Ok(rateios)
    }

    async fn participant_rows(&self, rateio_id: &str) -> Result<Vec<ParticipantRow>> {
        let rows = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT subscriber_id, name, uc, consumption_kwh, accumulated_credit_kwh,
                   percentage, priority, allocated_kwh, credit_used_kwh, remaining_credit_kwh
            FROM rateio_participants WHERE rateio_id = ? ORDER BY position
            "#,
        )
        .bind(rateio_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Move a pending rateio to completed and debit the credit each
    /// participant used from the subscriber record.
    ///
    /// The status change is a compare-and-set on `pending`, so completing
    /// the same rateio twice fails instead of applying credits twice. The
    /// debit is applied to the current balance, not the snapshot taken at
    /// save time, so rateios completed in any order compose.
    pub async fn complete_rateio(&self, id: RateioId) -> Result<Rateio> {
        let mut rateio = self
            .get_rateio(id)
            .await?
            .ok_or_else(|| DataError::NotFound(format!("rateio {}", id)))?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE rateios SET status = ? WHERE id = ? AND status = ?")
            .bind(RateioStatus::Completed.as_str())
            .bind(id.to_string())
            .bind(RateioStatus::Pending.as_str())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::InvalidTransition(format!(
                "rateio {} is {}, only pending rateios can be completed",
                id, rateio.status
            )));
        }

        for p in &rateio.participants {
            sqlx::query(
                "UPDATE subscribers SET accumulated_credit_kwh = MAX(accumulated_credit_kwh - ?, 0.0) WHERE id = ?",
            )
            .bind(p.credit_used_kwh)
            .bind(p.subscriber_id.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        rateio.status = RateioStatus::Completed;
        Ok(rateio)
    }

    // ==================== Invoice Operations ====================

    pub async fn insert_invoice(&self, i: &Invoice) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, subscriber_id, reference, consumption_kwh, compensated_kwh,
                tariff, discount_pct, amount_cents, due_date, status,
                attachment, issued_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(i.id.to_string())
        .bind(i.subscriber_id.to_string())
        .bind(i.reference.to_string())
        .bind(i.consumption_kwh)
        .bind(i.compensated_kwh)
        .bind(i.tariff)
        .bind(i.discount_pct)
        .bind(i.amount_cents)
        .bind(i.due_date.format("%Y-%m-%d").to_string())
        .bind(i.status.as_str())
        .bind(&i.attachment)
        .bind(i.issued_at.map(|t| t.to_rfc3339()))
        .bind(i.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(id = %i.id, reference = %i.reference, "inserted invoice");
        Ok(())
    }

    pub async fn get_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>> {
        let row = sqlx::query_as::<_, InvoiceRow>("SELECT * FROM invoices WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Invoice::try_from).transpose()
    }

    /// List invoices, optionally filtered by subscriber and/or month.
    pub async fn list_invoices(
        &self,
        subscriber: Option<SubscriberId>,
        reference: Option<ReferenceMonth>,
    ) -> Result<Vec<Invoice>> {
        let rows = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT * FROM invoices
            WHERE (?1 IS NULL OR subscriber_id = ?1)
              AND (?2 IS NULL OR reference = ?2)
            ORDER BY reference DESC, created_at DESC
            "#,
        )
        .bind(subscriber.map(|id| id.to_string()))
        .bind(reference.map(|r| r.to_string()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Invoice::try_from).collect()
    }

    /// Non-cancelled invoices for a subscriber and month.
    pub async fn count_active_invoices(
        &self,
        subscriber: SubscriberId,
        reference: ReferenceMonth,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM invoices WHERE subscriber_id = ? AND reference = ? AND status != ?",
        )
        .bind(subscriber.to_string())
        .bind(reference.to_string())
        .bind(InvoiceStatus::Cancelled.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Compare-and-set an invoice's status.
    pub async fn transition_invoice(
        &self,
        id: InvoiceId,
        from: InvoiceStatus,
        to: InvoiceStatus,
        issued_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET status = ?, issued_at = COALESCE(?, issued_at)
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(to.as_str())
        .bind(issued_at.map(|t| t.to_rfc3339()))
        .bind(id.to_string())
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::InvalidTransition(format!(
                "invoice {} is no longer {}",
                id, from
            )));
        }
        Ok(())
    }

    // ==================== Representative Operations ====================

    pub async fn insert_representative(&self, r: &Representative) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO representatives (id, name, document, email, phone, commission_pct, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(r.id.to_string())
        .bind(&r.name)
        .bind(r.document.digits())
        .bind(&r.email)
        .bind(r.phone.clone().map(String::from))
        .bind(r.commission_pct)
        .bind(r.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => DataError::Conflict(format!(
                "a representative with document {} already exists",
                r.document
            )),
            other => DataError::Database(other),
        })?;

        Ok(())
    }

    pub async fn get_representative(&self, id: RepresentativeId) -> Result<Option<Representative>> {
        let row =
            sqlx::query_as::<_, RepresentativeRow>("SELECT * FROM representatives WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Representative::try_from).transpose()
    }

    pub async fn list_representatives(&self) -> Result<Vec<Representative>> {
        let rows =
            sqlx::query_as::<_, RepresentativeRow>("SELECT * FROM representatives ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Representative::try_from).collect()
    }

    /// Paid invoice totals per representative for a month.
    ///
    /// Representatives without paid invoices that month still get a row.
    pub async fn commission_rows(&self, reference: ReferenceMonth) -> Result<Vec<CommissionRow>> {
        let rows = sqlx::query_as::<_, CommissionRow>(
            r#"
            SELECT
                r.id AS representative_id,
                r.name AS representative_name,
                r.commission_pct AS commission_pct,
                COUNT(i.id) AS paid_invoices,
                COALESCE(SUM(i.amount_cents), 0) AS billed_cents
            FROM representatives r
            LEFT JOIN subscribers s ON s.representative_id = r.id
            LEFT JOIN invoices i
                ON i.subscriber_id = s.id
               AND i.reference = ?
               AND i.status = ?
            GROUP BY r.id, r.name, r.commission_pct
            ORDER BY r.name
            "#,
        )
        .bind(reference.to_string())
        .bind(InvoiceStatus::Paid.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Address, AllocationKind, Document, EnergyAccount, Fidelidade, Participant,
        invoice_amount_cents,
    };
    use chrono::NaiveDate;
    use tempfile::tempdir;
    use uuid::Uuid;

    async fn open_db(dir: &tempfile::TempDir) -> LocalDb {
        LocalDb::open(&dir.path().join("db.sqlite")).await.unwrap()
    }

    fn account(uc: &str, holder: &str, doc: &str) -> EnergyAccount {
        EnergyAccount {
            uc: uc.parse().unwrap(),
            concessionaria: "CEMIG".to_string(),
            holder_name: holder.to_string(),
            holder_document: doc.parse().unwrap(),
        }
    }

    fn subscriber(name: &str, uc: &str, credit: f64) -> Subscriber {
        Subscriber {
            id: Uuid::new_v4(),
            name: name.to_string(),
            document: "529.982.247-25".parse().unwrap(),
            email: Some("maria@example.com".to_string()),
            phone: Some("31988887777".parse().unwrap()),
            address: Address {
                cep: Some("30160-011".parse().unwrap()),
                street: "Rua da Bahia".to_string(),
                number: "100".to_string(),
                complement: None,
                neighborhood: "Centro".to_string(),
                city: "Belo Horizonte".to_string(),
                state: "MG".to_string(),
            },
            account: account(uc, name, "529.982.247-25"),
            consumption_kwh: 300.0,
            accumulated_credit_kwh: credit,
            fidelidade: Fidelidade::OneYear,
            discount_pct: 15.0,
            representative_id: None,
            status: EntityStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn generator() -> Generator {
        Generator {
            id: Uuid::new_v4(),
            nickname: "Usina Norte".to_string(),
            owner_name: "Sol Nascente Energia Ltda".to_string(),
            owner_document: "11.222.333/0001-81".parse().unwrap(),
            account: account("300012345", "Sol Nascente Energia Ltda", "11.222.333/0001-81"),
            address: Address::default(),
            administrator: None,
            capacity_kwp: Some(75.0),
            expected_generation_kwh: 1000.0,
            status: EntityStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn pending_rateio(g: &Generator, subs: &[&Subscriber]) -> Rateio {
        let participants = subs
            .iter()
            .map(|s| {
                let mut p = Participant::new(
                    s.id,
                    s.name.clone(),
                    s.account.uc.clone(),
                    s.consumption_kwh,
                    s.accumulated_credit_kwh,
                )
                .with_percentage(100.0 / subs.len() as f64);
                p.allocated_kwh = 500.0;
                p.credit_used_kwh = s.accumulated_credit_kwh.min(500.0);
                p.remaining_credit_kwh = s.accumulated_credit_kwh - p.credit_used_kwh;
                p
            })
            .collect();

        Rateio {
            id: Uuid::now_v7(),
            generator_id: g.id,
            kind: AllocationKind::Percentage,
            period: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            expected_generation_kwh: g.expected_generation_kwh,
            unallocated_kwh: 0.0,
            participants,
            notes: Some("março".to_string()),
            attachment: None,
            status: RateioStatus::Pending,
            created_at: Utc::now(),
        }
    }

    fn invoice(subscriber_id: SubscriberId, reference: ReferenceMonth, status: InvoiceStatus) -> Invoice {
        Invoice {
            id: Uuid::now_v7(),
            subscriber_id,
            reference,
            consumption_kwh: 300.0,
            compensated_kwh: 250.0,
            tariff: 0.8,
            discount_pct: 10.0,
            amount_cents: invoice_amount_cents(250.0, 0.8, 10.0),
            due_date: NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(),
            status,
            attachment: None,
            issued_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_subscriber_roundtrip() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;

        let s = subscriber("Maria Souza", "700000001", 12.5);
        db.insert_subscriber(&s).await.unwrap();

        let loaded = db.get_subscriber(s.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Maria Souza");
        assert_eq!(loaded.address, s.address);
        assert_eq!(loaded.fidelidade, Fidelidade::OneYear);
        assert_eq!(loaded.accumulated_credit_kwh, 12.5);
        assert!(matches!(loaded.document, Document::Cpf(_)));

        let by_uc = db.find_subscriber_by_uc("700000001").await.unwrap().unwrap();
        assert_eq!(by_uc.id, s.id);
        assert!(db.get_subscriber(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_uc_rejected() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;

        db.insert_subscriber(&subscriber("A", "700000001", 0.0)).await.unwrap();
        let err = db
            .insert_subscriber(&subscriber("B", "700000001", 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_subscribers_by_status() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;

        let a = subscriber("Ana", "700000001", 0.0);
        let b = subscriber("Bruno", "700000002", 0.0);
        db.insert_subscriber(&a).await.unwrap();
        db.insert_subscriber(&b).await.unwrap();
        db.set_subscriber_status(b.id, EntityStatus::Inactive).await.unwrap();

        assert_eq!(db.list_subscribers(None).await.unwrap().len(), 2);
        let active = db.list_subscribers(Some(EntityStatus::Active)).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Ana");
    }

    #[tokio::test]
    async fn test_generator_updates() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;

        let g = generator();
        db.insert_generator(&g).await.unwrap();
        db.update_expected_generation(g.id, 1250.0).await.unwrap();
        db.set_generator_status(g.id, EntityStatus::Inactive).await.unwrap();

        let loaded = db.get_generator(g.id).await.unwrap().unwrap();
        assert_eq!(loaded.expected_generation_kwh, 1250.0);
        assert!(!loaded.is_active());

        let err = db.update_expected_generation(Uuid::new_v4(), 1.0).await.unwrap_err();
        assert!(matches!(err, DataError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rateio_insert_and_get() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;

        let g = generator();
        let a = subscriber("Ana", "700000001", 0.0);
        let b = subscriber("Bruno", "700000002", 40.0);
        db.insert_generator(&g).await.unwrap();
        db.insert_subscriber(&a).await.unwrap();
        db.insert_subscriber(&b).await.unwrap();

        let r = pending_rateio(&g, &[&a, &b]);
        db.insert_rateio(&r).await.unwrap();

        let loaded = db.get_rateio(r.id).await.unwrap().unwrap();
        assert_eq!(loaded.participants.len(), 2);
        assert_eq!(loaded.participants[0].name, "Ana");
        assert_eq!(loaded.participants[1].percentage, Some(50.0));
        assert_eq!(loaded.status, RateioStatus::Pending);
        assert_eq!(loaded.notes.as_deref(), Some("março"));

        assert_eq!(db.list_rateios(Some(g.id)).await.unwrap().len(), 1);
        assert!(db.list_rateios(Some(Uuid::new_v4())).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_complete_rateio_carries_credit_once() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;

        let g = generator();
        let a = subscriber("Ana", "700000001", 510.0);
        db.insert_generator(&g).await.unwrap();
        db.insert_subscriber(&a).await.unwrap();

        let r = pending_rateio(&g, &[&a]);
        db.insert_rateio(&r).await.unwrap();

        let done = db.complete_rateio(r.id).await.unwrap();
        assert_eq!(done.status, RateioStatus::Completed);

        let credit = db.get_subscriber(a.id).await.unwrap().unwrap().accumulated_credit_kwh;
        assert_eq!(credit, 10.0);

        let err = db.complete_rateio(r.id).await.unwrap_err();
        assert!(matches!(err, DataError::InvalidTransition(_)));
        let credit = db.get_subscriber(a.id).await.unwrap().unwrap().accumulated_credit_kwh;
        assert_eq!(credit, 10.0);
    }

    #[tokio::test]
    async fn test_completing_overlapping_rateios_never_restores_used_credit() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;

        let g = generator();
        let ana = subscriber("Ana", "700000001", 50.0);
        db.insert_generator(&g).await.unwrap();
        db.insert_subscriber(&ana).await.unwrap();

        // Both rateios were drafted while Ana still had 50 kWh of credit.
        let uses_credit = pending_rateio(&g, &[&ana]);
        let mut gives_nothing = pending_rateio(&g, &[&ana]);
        let p = &mut gives_nothing.participants[0];
        p.allocated_kwh = 0.0;
        p.credit_used_kwh = 0.0;
        p.remaining_credit_kwh = 50.0;
        db.insert_rateio(&uses_credit).await.unwrap();
        db.insert_rateio(&gives_nothing).await.unwrap();

        db.complete_rateio(uses_credit.id).await.unwrap();
        let credit = db.get_subscriber(ana.id).await.unwrap().unwrap().accumulated_credit_kwh;
        assert_eq!(credit, 0.0);

        db.complete_rateio(gives_nothing.id).await.unwrap();
        let credit = db.get_subscriber(ana.id).await.unwrap().unwrap().accumulated_credit_kwh;
        assert_eq!(credit, 0.0);
    }

    #[tokio::test]
    async fn test_delete_subscriber_in_rateio_refused() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;

        let g = generator();
        let a = subscriber("Ana", "700000001", 0.0);
        let b = subscriber("Bruno", "700000002", 0.0);
        db.insert_generator(&g).await.unwrap();
        db.insert_subscriber(&a).await.unwrap();
        db.insert_subscriber(&b).await.unwrap();
        db.insert_rateio(&pending_rateio(&g, &[&a])).await.unwrap();

        assert!(matches!(
            db.delete_subscriber(a.id).await.unwrap_err(),
            DataError::Conflict(_)
        ));
        db.delete_subscriber(b.id).await.unwrap();
        assert!(db.get_subscriber(b.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invoice_transitions() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;

        let s = subscriber("Ana", "700000001", 0.0);
        db.insert_subscriber(&s).await.unwrap();

        let march: ReferenceMonth = "2024-03".parse().unwrap();
        let inv = invoice(s.id, march, InvoiceStatus::Draft);
        db.insert_invoice(&inv).await.unwrap();
        assert_eq!(db.count_active_invoices(s.id, march).await.unwrap(), 1);

        let now = Utc::now();
        db.transition_invoice(inv.id, InvoiceStatus::Draft, InvoiceStatus::Issued, Some(now))
            .await
            .unwrap();
        let loaded = db.get_invoice(inv.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, InvoiceStatus::Issued);
        assert!(loaded.issued_at.is_some());

        // stale expected status
        let err = db
            .transition_invoice(inv.id, InvoiceStatus::Draft, InvoiceStatus::Cancelled, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidTransition(_)));

        db.transition_invoice(inv.id, InvoiceStatus::Issued, InvoiceStatus::Cancelled, None)
            .await
            .unwrap();
        assert_eq!(db.count_active_invoices(s.id, march).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_invoices_filters() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;

        let a = subscriber("Ana", "700000001", 0.0);
        let b = subscriber("Bruno", "700000002", 0.0);
        db.insert_subscriber(&a).await.unwrap();
        db.insert_subscriber(&b).await.unwrap();

        let march: ReferenceMonth = "2024-03".parse().unwrap();
        let april: ReferenceMonth = "2024-04".parse().unwrap();
        db.insert_invoice(&invoice(a.id, march, InvoiceStatus::Draft)).await.unwrap();
        db.insert_invoice(&invoice(a.id, april, InvoiceStatus::Draft)).await.unwrap();
        db.insert_invoice(&invoice(b.id, march, InvoiceStatus::Draft)).await.unwrap();

        assert_eq!(db.list_invoices(None, None).await.unwrap().len(), 3);
        assert_eq!(db.list_invoices(Some(a.id), None).await.unwrap().len(), 2);
        assert_eq!(db.list_invoices(None, Some(march)).await.unwrap().len(), 2);
        assert_eq!(db.list_invoices(Some(b.id), Some(april)).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_commission_rows() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;

        let rep = Representative {
            id: Uuid::new_v4(),
            name: "Carlos".to_string(),
            document: "529.982.247-25".parse().unwrap(),
            email: None,
            phone: None,
            commission_pct: 5.0,
            created_at: Utc::now(),
        };
        let idle = Representative {
            id: Uuid::new_v4(),
            name: "Zeca".to_string(),
            document: "11.222.333/0001-81".parse().unwrap(),
            ..rep.clone()
        };
        db.insert_representative(&rep).await.unwrap();
        db.insert_representative(&idle).await.unwrap();

        let mut s = subscriber("Ana", "700000001", 0.0);
        s.representative_id = Some(rep.id);
        db.insert_subscriber(&s).await.unwrap();

        let march: ReferenceMonth = "2024-03".parse().unwrap();
        db.insert_invoice(&invoice(s.id, march, InvoiceStatus::Paid)).await.unwrap();
        db.insert_invoice(&invoice(s.id, march, InvoiceStatus::Issued)).await.unwrap();

        let rows = db.commission_rows(march).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].representative_name, "Carlos");
        assert_eq!(rows[0].paid_invoices, 1);
        assert_eq!(rows[0].billed_cents, 18000);
        assert_eq!(rows[1].paid_invoices, 0);
        assert_eq!(rows[1].billed_cents, 0);
    }

    #[tokio::test]
    async fn test_duplicate_representative_document() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;

        let rep = Representative {
            id: Uuid::new_v4(),
            name: "Carlos".to_string(),
            document: "529.982.247-25".parse().unwrap(),
            email: None,
            phone: None,
            commission_pct: 5.0,
            created_at: Utc::now(),
        };
        db.insert_representative(&rep).await.unwrap();

        let again = Representative { id: Uuid::new_v4(), ..rep.clone() };
        assert!(matches!(
            db.insert_representative(&again).await.unwrap_err(),
            DataError::Conflict(_)
        ));
        assert_eq!(db.list_representatives().await.unwrap().len(), 1);
    }
}
