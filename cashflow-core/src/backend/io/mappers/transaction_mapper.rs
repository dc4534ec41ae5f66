use chrono::{DateTime, NaiveDate};
use shared::TransactionRecord;

use crate::backend::domain::models::{MonthKey, Transaction as DomainTransaction};
use crate::backend::storage::FetchError;

pub struct TransactionMapper;

impl TransactionMapper {
    /// Map a whole fetch response. One unusable record fails the whole
    /// response; there is no partial success.
    pub fn records_to_domain(
        records: Vec<TransactionRecord>,
    ) -> Result<Vec<DomainTransaction>, FetchError> {
        records.into_iter().map(Self::to_domain).collect()
    }

    pub fn to_domain(dto: TransactionRecord) -> Result<DomainTransaction, FetchError> {
        if dto.id.trim().is_empty() {
            return Err(FetchError::Decoding("transaction without id".to_string()));
        }
        if !dto.normalized_amount.is_finite() {
            return Err(FetchError::Decoding(format!(
                "transaction {} has a non-finite amount",
                dto.id
            )));
        }

        let effective_category_name = dto
            .effective_category_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| dto.category_name.clone());

        Ok(DomainTransaction {
            id: dto.id,
            category_name: dto.category_name,
            effective_category_name,
            is_income: dto.is_income,
            normalized_amount: dto.normalized_amount,
            parsed_date: dto.payment_date.as_deref().and_then(Self::parse_payment_date),
            flow_month: dto
                .flow_month
                .as_deref()
                .and_then(|value| value.parse::<MonthKey>().ok()),
            excluded_from_flow: dto.excluded_from_flow,
            business_name: dto.business_name,
        })
    }

    pub fn to_dto(domain: DomainTransaction) -> TransactionRecord {
        TransactionRecord {
            effective_category_name: Some(domain.effective_category_name),
            id: domain.id,
            category_name: domain.category_name,
            is_income: domain.is_income,
            normalized_amount: domain.normalized_amount,
            payment_date: domain.parsed_date.map(|date| date.format("%Y-%m-%d").to_string()),
            flow_month: domain.flow_month.map(|month| month.to_string()),
            excluded_from_flow: domain.excluded_from_flow,
            business_name: domain.business_name,
        }
    }

    /// Parse "YYYY-MM-DD" or an RFC 3339 timestamp (the local date part is kept)
    pub fn parse_payment_date(value: &str) -> Option<NaiveDate> {
        let trimmed = value.trim();
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Some(date);
        }
        if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
            return Some(timestamp.date_naive());
        }
        trimmed
            .split('T')
            .next()
            .and_then(|date_part| NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok())
    }
}
