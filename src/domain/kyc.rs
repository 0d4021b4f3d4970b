use crate::domain::profile::UserId;
use crate::domain::submission::{ReviewDecision, SubmissionStatus};
use crate::error::ExchangeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum IdType {
    NationalId,
    DriversLicense,
    Passport,
    VotersCard,
}

/// An identity document as uploaded by the user. Image bytes live in
/// external object storage; only the refs travel through this crate.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct KycDocument {
    pub id_type: IdType,
    pub id_number: String,
    pub front_ref: String,
    pub back_ref: Option<String>,
}

impl KycDocument {
    /// Passports are single-sided; every other id type needs both sides.
    pub fn validate(&self) -> Result<(), ExchangeError> {
        if self.id_number.trim().is_empty() {
            return Err(ExchangeError::InvalidDocument(
                "id number is required".to_string(),
            ));
        }
        if self.front_ref.trim().is_empty() {
            return Err(ExchangeError::InvalidDocument(
                "front image is required".to_string(),
            ));
        }
        if self.id_type != IdType::Passport && self.back_ref.is_none() {
            return Err(ExchangeError::InvalidDocument(
                "back image is required for this id type".to_string(),
            ));
        }
        Ok(())
    }
}

/// A KYC submission under admin review. Approval is what releases any
/// pending referral bonus for this user.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct KycSubmission {
    pub id: Uuid,
    pub user_id: UserId,
    pub id_type: IdType,
    pub id_number: String,
    pub front_ref: String,
    pub back_ref: Option<String>,
    pub status: SubmissionStatus,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl KycSubmission {
    pub const COLLECTION: &'static str = "kyc_submissions";

    pub fn new(user_id: UserId, document: KycDocument) -> Result<Self, ExchangeError> {
        document.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            id_type: document.id_type,
            id_number: document.id_number,
            front_ref: document.front_ref,
            back_ref: document.back_ref,
            status: SubmissionStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            rejection_reason: None,
            submitted_at: Utc::now(),
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == SubmissionStatus::Pending
    }

    pub fn review(
        &mut self,
        decision: &ReviewDecision,
        reviewer: UserId,
    ) -> Result<(), ExchangeError> {
        if !self.is_pending() {
            return Err(ExchangeError::AlreadyReviewed {
                collection: Self::COLLECTION,
                id: self.id.to_string(),
            });
        }
        match decision {
            ReviewDecision::Approve => {
                self.status = SubmissionStatus::Approved;
            }
            ReviewDecision::Reject { reason } => {
                self.status = SubmissionStatus::Rejected;
                self.rejection_reason = Some(reason.clone());
            }
        }
        self.reviewed_by = Some(reviewer);
        self.reviewed_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(id_type: IdType, back: Option<&str>) -> KycDocument {
        KycDocument {
            id_type,
            id_number: "A12345678".to_string(),
            front_ref: "kyc/front.jpg".to_string(),
            back_ref: back.map(|b| b.to_string()),
        }
    }

    #[test]
    fn test_passport_needs_no_back_image() {
        assert!(document(IdType::Passport, None).validate().is_ok());
    }

    #[test]
    fn test_other_id_types_need_back_image() {
        let err = document(IdType::NationalId, None).validate().unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidDocument(_)));
        assert!(
            document(IdType::NationalId, Some("kyc/back.jpg"))
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_empty_id_number_rejected() {
        let mut doc = document(IdType::Passport, None);
        doc.id_number = "  ".to_string();
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_kyc_review_exactly_once() {
        let mut submission = KycSubmission::new(
            UserId::from("user-1"),
            document(IdType::VotersCard, Some("kyc/back.jpg")),
        )
        .unwrap();

        submission
            .review(&ReviewDecision::Approve, UserId::from("admin-1"))
            .unwrap();
        assert_eq!(submission.status, SubmissionStatus::Approved);

        let err = submission
            .review(
                &ReviewDecision::Reject {
                    reason: "Document quality issues".to_string(),
                },
                UserId::from("admin-2"),
            )
            .unwrap_err();
        assert!(matches!(err, ExchangeError::AlreadyReviewed { .. }));
    }
}
