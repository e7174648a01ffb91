use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::domain::{CommissionTransaction, Decimal, MemberId};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSaleRequest {
    pub buyer_id: i64,
    /// Client-supplied id for retry-safe submission.
    pub sale_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSaleResponse {
    pub sale_id: Uuid,
    pub transactions: Vec<TransactionDto>,
    pub total_distributed: String,
    pub passive_pool_amount: String,
    pub company_fund_amount: String,
    pub forfeited_to_company: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPurchaseRequest {
    pub buyer_id: i64,
    pub amount: Decimal,
    pub purchase_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPurchaseResponse {
    pub purchase_id: Uuid,
    pub transactions: Vec<TransactionDto>,
    pub total_allocated: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: Uuid,
    pub recipient_id: i64,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<String>,
    pub amount: String,
    pub status: String,
}

impl TransactionDto {
    fn from_transaction(tx: &CommissionTransaction) -> Self {
        TransactionDto {
            id: tx.id,
            recipient_id: tx.recipient_id.as_i64(),
            category: tx.category.encode(),
            rate: tx.rate.map(|r| r.to_canonical_string()),
            amount: tx.amount.to_canonical_string(),
            status: tx.status.encode().to_string(),
        }
    }
}

/// Records one monoline unit sale and distributes its fixed split.
pub async fn record_sale(
    State(state): State<AppState>,
    Json(body): Json<RecordSaleRequest>,
) -> Result<Json<RecordSaleResponse>, AppError> {
    let result = state
        .distributor
        .distribute_monoline_sale(MemberId::new(body.buyer_id), body.sale_id)
        .await?;

    Ok(Json(RecordSaleResponse {
        sale_id: result.sale_id,
        transactions: result
            .transactions
            .iter()
            .map(TransactionDto::from_transaction)
            .collect(),
        total_distributed: result.total_distributed.to_canonical_string(),
        passive_pool_amount: result.passive_pool_amount.to_canonical_string(),
        company_fund_amount: result.company_fund_amount.to_canonical_string(),
        forfeited_to_company: result.forfeited_to_company.to_canonical_string(),
    }))
}

/// Records a classic package purchase and runs the percentage cascade.
pub async fn record_purchase(
    State(state): State<AppState>,
    Json(body): Json<RecordPurchaseRequest>,
) -> Result<Json<RecordPurchaseResponse>, AppError> {
    let result = state
        .distributor
        .distribute_classic_purchase(MemberId::new(body.buyer_id), body.amount, body.purchase_id)
        .await?;

    Ok(Json(RecordPurchaseResponse {
        purchase_id: result.purchase_id,
        transactions: result
            .transactions
            .iter()
            .map(TransactionDto::from_transaction)
            .collect(),
        total_allocated: result.total_allocated.to_canonical_string(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberTransactionsResponse {
    pub member_id: i64,
    pub transactions: Vec<TransactionDto>,
}

/// Commission history credited to one member, oldest first.
pub async fn list_member_transactions(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
) -> Result<Json<MemberTransactionsResponse>, AppError> {
    let id = MemberId::new(member_id);
    state
        .repo
        .get_member(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("member {} does not exist", member_id)))?;

    let transactions = state.repo.query_transactions_for_recipient(id).await?;
    Ok(Json(MemberTransactionsResponse {
        member_id,
        transactions: transactions
            .iter()
            .map(TransactionDto::from_transaction)
            .collect(),
    }))
}
