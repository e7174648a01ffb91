//! Repository layer for database operations.
//!
//! All storage access goes through `Repository`; the engines never see sqlx.
//! Decimal columns are stored as canonical strings and parsed back with a
//! warn-and-default fallback, so one corrupted row cannot poison a batch.

use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{
    CommissionCategory, CommissionTransaction, Decimal, Member, MemberCode, MemberId, Side,
    TimeMs, TransactionStatus, Wallet,
};

/// A recorded sale/purchase event, the idempotency anchor for distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleRecord {
    pub id: Uuid,
    pub buyer_id: MemberId,
    pub kind: String,
    pub amount: Decimal,
    pub commission_distributed: bool,
    pub created_ms: TimeMs,
}

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

fn parse_decimal(raw: &str, column: &str) -> Decimal {
    Decimal::from_str_canonical(raw).unwrap_or_else(|e| {
        warn!(
            column = column,
            value = raw,
            error = %e,
            "Failed to parse decimal column, using zero"
        );
        Decimal::zero()
    })
}

fn member_from_row(row: &sqlx::sqlite::SqliteRow) -> Member {
    let id: i64 = row.get("id");
    let code: String = row.get("code");
    let sponsor_id: Option<i64> = row.get("sponsor_id");
    let left_child: Option<i64> = row.get("left_child");
    let right_child: Option<i64> = row.get("right_child");
    let career_level: i64 = row.get("career_level");
    let is_active: i64 = row.get("is_active");
    let joined_ms: i64 = row.get("joined_ms");

    let dec = |col: &str| -> Decimal { parse_decimal(row.get::<String, _>(col).as_str(), col) };

    Member {
        id: MemberId::new(id),
        code: MemberCode::new(code),
        sponsor_id: sponsor_id.map(MemberId::new),
        left_child: left_child.map(MemberId::new),
        right_child: right_child.map(MemberId::new),
        career_level: career_level as u8,
        monthly_sales: dec("monthly_sales"),
        annual_sales: dec("annual_sales"),
        total_investment: dec("total_investment"),
        is_active: is_active != 0,
        wallet: Wallet {
            balance: dec("balance"),
            total_earnings: dec("total_earnings"),
            sponsor_bonus: dec("sponsor_bonus"),
            career_bonus: dec("career_bonus"),
            passive_income: dec("passive_income"),
            leadership_bonus: dec("leadership_bonus"),
        },
        joined_ms: TimeMs::new(joined_ms),
    }
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    // =========================================================================
    // Member operations
    // =========================================================================

    /// Insert a new member and return its generated id.
    pub async fn insert_member(
        &self,
        code: &MemberCode,
        sponsor_id: Option<MemberId>,
        joined_ms: TimeMs,
    ) -> Result<MemberId, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO members (code, sponsor_id, joined_ms)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(code.as_str())
        .bind(sponsor_id.map(|s| s.as_i64()))
        .bind(joined_ms.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(MemberId::new(result.last_insert_rowid()))
    }

    pub async fn get_member(&self, id: MemberId) -> Result<Option<Member>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM members WHERE id = ?")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(member_from_row))
    }

    pub async fn get_member_by_code(
        &self,
        code: &MemberCode,
    ) -> Result<Option<Member>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM members WHERE code = ?")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(member_from_row))
    }

    /// Load the full member set for one calculation pass.
    pub async fn load_all_members(&self) -> Result<Vec<Member>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM members ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(member_from_row).collect())
    }

    pub async fn count_members(&self) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM members")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Attach a member under a parent: fills the chosen child slot and sets
    /// the child's sponsor pointer in one transaction. Fails if the slot is
    /// already occupied; a filled slot is never silently reassigned.
    pub async fn attach_member(
        &self,
        parent_id: MemberId,
        side: Side,
        child_id: MemberId,
    ) -> Result<(), sqlx::Error> {
        let column = match side {
            Side::Left => "left_child",
            Side::Right => "right_child",
        };

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(&format!(
            "UPDATE members SET {column} = ? WHERE id = ? AND {column} IS NULL"
        ))
        .bind(child_id.as_i64())
        .bind(parent_id.as_i64())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        sqlx::query("UPDATE members SET sponsor_id = ? WHERE id = ?")
            .bind(parent_id.as_i64())
            .bind(child_id.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Insert a new member and claim its parent slot in one transaction.
    ///
    /// The member code is derived from the generated row id, so concurrent
    /// registrations cannot hand out the same code. When the slot is already
    /// occupied the whole transaction rolls back: no orphan row, no burned
    /// code.
    pub async fn insert_member_attached(
        &self,
        parent_id: MemberId,
        side: Side,
        joined_ms: TimeMs,
    ) -> Result<(MemberId, MemberCode), sqlx::Error> {
        let column = match side {
            Side::Left => "left_child",
            Side::Right => "right_child",
        };

        let mut tx = self.pool.begin().await?;

        // The row id is unknown until after the insert; a throwaway unique
        // code keeps the UNIQUE constraint satisfied until the real one is
        // written.
        let placeholder = Uuid::new_v4().to_string();
        let result = sqlx::query(
            r#"
            INSERT INTO members (code, sponsor_id, joined_ms)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(placeholder.as_str())
        .bind(parent_id.as_i64())
        .bind(joined_ms.as_ms())
        .execute(&mut *tx)
        .await?;

        let child_id = MemberId::new(result.last_insert_rowid());
        let code = MemberCode::from_sequence(child_id.as_i64());
        sqlx::query("UPDATE members SET code = ? WHERE id = ?")
            .bind(code.as_str())
            .bind(child_id.as_i64())
            .execute(&mut *tx)
            .await?;

        let claimed = sqlx::query(&format!(
            "UPDATE members SET {column} = ? WHERE id = ? AND {column} IS NULL"
        ))
        .bind(child_id.as_i64())
        .bind(parent_id.as_i64())
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(sqlx::Error::RowNotFound);
        }

        tx.commit().await?;
        Ok((child_id, code))
    }

    /// Persist a member's mutable state: tree pointers, activity metrics,
    /// career level, and wallet.
    pub async fn update_member(&self, member: &Member) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE members SET
                sponsor_id = ?,
                left_child = ?,
                right_child = ?,
                career_level = ?,
                monthly_sales = ?,
                annual_sales = ?,
                total_investment = ?,
                is_active = ?,
                balance = ?,
                total_earnings = ?,
                sponsor_bonus = ?,
                career_bonus = ?,
                passive_income = ?,
                leadership_bonus = ?
            WHERE id = ?
            "#,
        )
        .bind(member.sponsor_id.map(|s| s.as_i64()))
        .bind(member.left_child.map(|c| c.as_i64()))
        .bind(member.right_child.map(|c| c.as_i64()))
        .bind(member.career_level as i64)
        .bind(member.monthly_sales.to_canonical_string())
        .bind(member.annual_sales.to_canonical_string())
        .bind(member.total_investment.to_canonical_string())
        .bind(member.is_active as i64)
        .bind(member.wallet.balance.to_canonical_string())
        .bind(member.wallet.total_earnings.to_canonical_string())
        .bind(member.wallet.sponsor_bonus.to_canonical_string())
        .bind(member.wallet.career_bonus.to_canonical_string())
        .bind(member.wallet.passive_income.to_canonical_string())
        .bind(member.wallet.leadership_bonus.to_canonical_string())
        .bind(member.id.as_i64())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Update wallets for several members in one transaction.
    pub async fn update_members_batch(&self, members: &[Member]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for member in members {
            sqlx::query(
                r#"
                UPDATE members SET
                    monthly_sales = ?,
                    annual_sales = ?,
                    total_investment = ?,
                    is_active = ?,
                    balance = ?,
                    total_earnings = ?,
                    sponsor_bonus = ?,
                    career_bonus = ?,
                    passive_income = ?,
                    leadership_bonus = ?
                WHERE id = ?
                "#,
            )
            .bind(member.monthly_sales.to_canonical_string())
            .bind(member.annual_sales.to_canonical_string())
            .bind(member.total_investment.to_canonical_string())
            .bind(member.is_active as i64)
            .bind(member.wallet.balance.to_canonical_string())
            .bind(member.wallet.total_earnings.to_canonical_string())
            .bind(member.wallet.sponsor_bonus.to_canonical_string())
            .bind(member.wallet.career_bonus.to_canonical_string())
            .bind(member.wallet.passive_income.to_canonical_string())
            .bind(member.wallet.leadership_bonus.to_canonical_string())
            .bind(member.id.as_i64())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // Sale operations
    // =========================================================================

    pub async fn insert_sale(&self, sale: &SaleRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO sales (id, buyer_id, kind, amount, commission_distributed, created_ms)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(sale.id.to_string())
        .bind(sale.buyer_id.as_i64())
        .bind(sale.kind.as_str())
        .bind(sale.amount.to_canonical_string())
        .bind(sale.commission_distributed as i64)
        .bind(sale.created_ms.as_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_sale(&self, id: Uuid) -> Result<Option<SaleRecord>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM sales WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| {
            let id_raw: String = row.get("id");
            let buyer_id: i64 = row.get("buyer_id");
            let kind: String = row.get("kind");
            let amount: String = row.get("amount");
            let distributed: i64 = row.get("commission_distributed");
            let created_ms: i64 = row.get("created_ms");
            SaleRecord {
                id: Uuid::parse_str(&id_raw).unwrap_or_else(|_| Uuid::nil()),
                buyer_id: MemberId::new(buyer_id),
                kind,
                amount: parse_decimal(&amount, "amount"),
                commission_distributed: distributed != 0,
                created_ms: TimeMs::new(created_ms),
            }
        }))
    }

    /// Claim a sale for distribution. Returns false if another pass already
    /// distributed it; this is the sale-level idempotency gate.
    pub async fn mark_sale_distributed(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sales SET commission_distributed = 1
             WHERE id = ? AND commission_distributed = 0",
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Commission transaction operations
    // =========================================================================

    /// Insert transactions idempotently; duplicates by id are ignored.
    pub async fn insert_transactions_batch(
        &self,
        transactions: &[CommissionTransaction],
    ) -> Result<usize, sqlx::Error> {
        if transactions.is_empty() {
            return Ok(0);
        }

        let mut inserted = 0usize;
        let mut tx = self.pool.begin().await?;

        for t in transactions {
            let result = sqlx::query(
                r#"
                INSERT INTO commission_transactions
                    (id, sale_id, buyer_id, recipient_id, category, rate, amount,
                     status, created_ms, settled_ms)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO NOTHING
                "#,
            )
            .bind(t.id.to_string())
            .bind(t.sale_id.to_string())
            .bind(t.buyer_id.as_i64())
            .bind(t.recipient_id.as_i64())
            .bind(t.category.encode())
            .bind(t.rate.map(|r| r.to_canonical_string()))
            .bind(t.amount.to_canonical_string())
            .bind(t.status.encode())
            .bind(t.created_ms.as_ms())
            .bind(t.settled_ms.map(|s| s.as_ms()))
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Transactions recorded for a sale, payout order preserved.
    pub async fn query_transactions_for_sale(
        &self,
        sale_id: Uuid,
    ) -> Result<Vec<CommissionTransaction>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT * FROM commission_transactions WHERE sale_id = ? ORDER BY created_ms ASC, id ASC",
        )
        .bind(sale_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(transaction_from_row).collect())
    }

    pub async fn query_transactions_for_recipient(
        &self,
        recipient: MemberId,
    ) -> Result<Vec<CommissionTransaction>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT * FROM commission_transactions WHERE recipient_id = ?
             ORDER BY created_ms ASC, id ASC",
        )
        .bind(recipient.as_i64())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(transaction_from_row).collect())
    }
}

fn transaction_from_row(row: &sqlx::sqlite::SqliteRow) -> CommissionTransaction {
    let id_raw: String = row.get("id");
    let sale_raw: String = row.get("sale_id");
    let buyer_id: i64 = row.get("buyer_id");
    let recipient_id: i64 = row.get("recipient_id");
    let category_raw: String = row.get("category");
    let rate: Option<String> = row.get("rate");
    let amount: String = row.get("amount");
    let status_raw: String = row.get("status");
    let created_ms: i64 = row.get("created_ms");
    let settled_ms: Option<i64> = row.get("settled_ms");

    CommissionTransaction {
        id: Uuid::parse_str(&id_raw).unwrap_or_else(|_| Uuid::nil()),
        sale_id: Uuid::parse_str(&sale_raw).unwrap_or_else(|_| Uuid::nil()),
        buyer_id: MemberId::new(buyer_id),
        recipient_id: MemberId::new(recipient_id),
        category: CommissionCategory::decode(&category_raw).unwrap_or_else(|| {
            warn!(category = category_raw, "Unknown commission category, defaulting");
            CommissionCategory::CompanyFund
        }),
        rate: rate.map(|r| parse_decimal(&r, "rate")),
        amount: parse_decimal(&amount, "amount"),
        status: TransactionStatus::decode(&status_raw).unwrap_or_default(),
        created_ms: TimeMs::new(created_ms),
        settled_ms: settled_ms.map(TimeMs::new),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use tempfile::TempDir;

    async fn setup_repo() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get_member() {
        let (repo, _temp) = setup_repo().await;
        let id = repo
            .insert_member(&MemberCode::from_sequence(1), None, TimeMs::new(1000))
            .await
            .unwrap();

        let member = repo.get_member(id).await.unwrap().expect("member exists");
        assert_eq!(member.code, MemberCode::from_sequence(1));
        assert_eq!(member.sponsor_id, None);
        assert_eq!(member.wallet.balance, Decimal::zero());
        assert!(repo.get_member(MemberId::new(999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_attach_member_sets_both_pointers() {
        let (repo, _temp) = setup_repo().await;
        let root = repo
            .insert_member(&MemberCode::from_sequence(1), None, TimeMs::new(0))
            .await
            .unwrap();
        let child = repo
            .insert_member(&MemberCode::from_sequence(2), None, TimeMs::new(0))
            .await
            .unwrap();

        repo.attach_member(root, Side::Left, child).await.unwrap();

        let root_row = repo.get_member(root).await.unwrap().unwrap();
        assert_eq!(root_row.left_child, Some(child));
        let child_row = repo.get_member(child).await.unwrap().unwrap();
        assert_eq!(child_row.sponsor_id, Some(root));
    }

    #[tokio::test]
    async fn test_attach_member_refuses_occupied_slot() {
        let (repo, _temp) = setup_repo().await;
        let root = repo
            .insert_member(&MemberCode::from_sequence(1), None, TimeMs::new(0))
            .await
            .unwrap();
        let a = repo
            .insert_member(&MemberCode::from_sequence(2), None, TimeMs::new(0))
            .await
            .unwrap();
        let b = repo
            .insert_member(&MemberCode::from_sequence(3), None, TimeMs::new(0))
            .await
            .unwrap();

        repo.attach_member(root, Side::Left, a).await.unwrap();
        assert!(repo.attach_member(root, Side::Left, b).await.is_err());

        // Slot still holds the first child.
        let root_row = repo.get_member(root).await.unwrap().unwrap();
        assert_eq!(root_row.left_child, Some(a));
    }

    #[tokio::test]
    async fn test_insert_member_attached_links_and_codes_in_one_step() {
        let (repo, _temp) = setup_repo().await;
        let root = repo
            .insert_member(&MemberCode::from_sequence(1), None, TimeMs::new(0))
            .await
            .unwrap();

        let (child, code) = repo
            .insert_member_attached(root, Side::Right, TimeMs::new(5))
            .await
            .unwrap();
        assert_eq!(code, MemberCode::from_sequence(child.as_i64()));

        let root_row = repo.get_member(root).await.unwrap().unwrap();
        assert_eq!(root_row.right_child, Some(child));
        let child_row = repo.get_member(child).await.unwrap().unwrap();
        assert_eq!(child_row.sponsor_id, Some(root));
        assert_eq!(child_row.code, code);
    }

    #[tokio::test]
    async fn test_insert_member_attached_rolls_back_on_occupied_slot() {
        let (repo, _temp) = setup_repo().await;
        let root = repo
            .insert_member(&MemberCode::from_sequence(1), None, TimeMs::new(0))
            .await
            .unwrap();
        let (first, _) = repo
            .insert_member_attached(root, Side::Left, TimeMs::new(0))
            .await
            .unwrap();

        // A second claim on the same slot must leave no member row behind.
        let before = repo.count_members().await.unwrap();
        let err = repo
            .insert_member_attached(root, Side::Left, TimeMs::new(0))
            .await
            .unwrap_err();
        assert!(matches!(err, sqlx::Error::RowNotFound));
        assert_eq!(repo.count_members().await.unwrap(), before);

        let root_row = repo.get_member(root).await.unwrap().unwrap();
        assert_eq!(root_row.left_child, Some(first));
    }

    #[tokio::test]
    async fn test_update_member_roundtrips_wallet() {
        let (repo, _temp) = setup_repo().await;
        let id = repo
            .insert_member(&MemberCode::from_sequence(1), None, TimeMs::new(0))
            .await
            .unwrap();

        let mut member = repo.get_member(id).await.unwrap().unwrap();
        member.monthly_sales = d("20");
        member.is_active = true;
        member.wallet.balance = d("123.45");
        member.wallet.sponsor_bonus = d("100");
        repo.update_member(&member).await.unwrap();

        let reloaded = repo.get_member(id).await.unwrap().unwrap();
        assert_eq!(reloaded.monthly_sales, d("20"));
        assert!(reloaded.is_active);
        assert_eq!(reloaded.wallet.balance, d("123.45"));
        assert_eq!(reloaded.wallet.sponsor_bonus, d("100"));
    }

    #[tokio::test]
    async fn test_mark_sale_distributed_claims_once() {
        let (repo, _temp) = setup_repo().await;
        let sale = SaleRecord {
            id: Uuid::new_v4(),
            buyer_id: MemberId::new(1),
            kind: "monoline".to_string(),
            amount: d("20.00"),
            commission_distributed: false,
            created_ms: TimeMs::new(1000),
        };
        repo.insert_sale(&sale).await.unwrap();

        assert!(repo.mark_sale_distributed(sale.id).await.unwrap());
        assert!(!repo.mark_sale_distributed(sale.id).await.unwrap());

        let stored = repo.get_sale(sale.id).await.unwrap().unwrap();
        assert!(stored.commission_distributed);
    }

    #[tokio::test]
    async fn test_transactions_batch_idempotent() {
        let (repo, _temp) = setup_repo().await;
        let sale_id = Uuid::new_v4();
        let tx = CommissionTransaction::new(
            sale_id,
            MemberId::new(1),
            MemberId::new(2),
            CommissionCategory::Level(3),
            None,
            d("1.00"),
            TimeMs::new(1000),
        );

        let first = repo.insert_transactions_batch(&[tx.clone()]).await.unwrap();
        let second = repo.insert_transactions_batch(&[tx.clone()]).await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 0);

        let stored = repo.query_transactions_for_sale(sale_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].category, CommissionCategory::Level(3));
        assert_eq!(stored[0].amount, d("1.00"));
    }
}
