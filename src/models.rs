use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::choices::{
    Certificate, CorrespondenceMethod, DisclosureOutcome, DocumentDisposition, Exemption,
    FoiOutcome, ThirdPartyConsultationReason,
};

// ============ Case ============

/// Editable attributes of a Case.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct CaseFields {
    pub title: String,
    pub subject: String,
    pub received_date: Option<NaiveDate>,
    pub enquiry_date: Option<NaiveDate>,
    pub enquiry_ref: String,
    pub enquiry_method: Option<CorrespondenceMethod>,
    pub response_method: Option<CorrespondenceMethod>,
    pub enquiry_description: String,
    pub urgent_flag: bool,
    pub handling_instructions: String,
    pub addressee_name: String,
}

/// A single FOI request and its administrative metadata.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Case {
    pub id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: CaseFields,
    pub created_date: DateTime<Utc>,
    pub created_by: String,
}

// ============ Comment ============

#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct CommentFields {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comment {
    pub id: Uuid,
    pub case_id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: CommentFields,
    pub created_date: DateTime<Utc>,
    pub created_by: String,
}

// ============ Assessment ============

/// Fee and third-party consultation worksheet. No cross-field rules apply.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct AssessmentFields {
    pub third_party_consultation: bool,
    pub precedents: bool,
    pub precedent_details: Option<String>,

    // fee details
    pub fee_flag: bool,
    pub search_and_retrieval_time: Option<BigDecimal>,
    pub decision_making_time: Option<BigDecimal>,
    pub photocopy_charges: Option<BigDecimal>,
    pub other_access_time: Option<BigDecimal>,
    pub postage_charges: Option<BigDecimal>,
    pub initial_deposit: Option<BigDecimal>,
    pub request_general_description: String,
    pub include_refine_request_flag: bool,
    pub include_third_party_consultation_flag: bool,
    pub request_concerning: Option<ThirdPartyConsultationReason>,
    pub contact_name: String,
    pub contact_telephone: String,

    // fee metadata
    pub fee_notice_issued_flag: bool,
    pub fee_notice_issued_date: Option<NaiveDate>,
    pub fee_payment_required_date: Option<NaiveDate>,
    pub fee_paid_flag: bool,
    pub fee_received_date: Option<NaiveDate>,
    pub fee_limit_flag: bool,

    // third party consultation data
    pub third_party_request_general_description: String,
    pub documents_attached_or_described: Option<DocumentDisposition>,
    pub include_s47_flag: bool,
    pub include_s47b_flag: bool,
    pub include_s47f_flag: bool,
    pub include_s47g_flag: bool,
    pub respond_by_date: Option<NaiveDate>,
    pub third_party_contact_name: String,
    pub third_party_contact_telephone: String,

    // third party details
    pub third_party_title: String,
    pub third_party_name: String,
    pub third_party_department: String,
    pub third_party_organisation: String,
    pub third_party_address: String,
    pub third_party_postcode: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Assessment {
    pub id: Uuid,
    pub case_id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: AssessmentFields,
}

// ============ Outcome ============

/// Final disclosure classification. The five fields are independent.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct OutcomeFields {
    pub foi_outcome: Option<FoiOutcome>,
    pub foi_exemption: Option<Exemption>,
    pub foi_conditional_exemption: Option<Exemption>,
    pub disclosure_outcome: Option<DisclosureOutcome>,
    pub certificate: Option<Certificate>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Outcome {
    pub id: Uuid,
    pub case_id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: OutcomeFields,
}

// ============ Escalation stages ============

#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct InternalReviewFields {
    pub requested_date: Option<NaiveDate>,
    pub review_held_date: Option<NaiveDate>,
    pub days_taken_to_hold_review: Option<i32>,
    pub review_members: Option<String>,
    pub review_decision: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InternalReview {
    pub id: Uuid,
    pub case_id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: InternalReviewFields,
}

/// Milestones shared by Information Commissioner and Tribunal appeals.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct AppealFields {
    pub contacted_date: Option<NaiveDate>,
    pub documents_provided_date: Option<NaiveDate>,
    pub decision_received_date: Option<NaiveDate>,
    pub decision: Option<String>,
    pub decision_notice: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InformationCommissionerAppeal {
    pub id: Uuid,
    pub case_id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: AppealFields,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AdministrativeAppealsTribunal {
    pub id: Uuid,
    pub case_id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: AppealFields,
}

// ============ MP ============

/// Member of Parliament reference record. Not linked to cases.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct MpFields {
    pub title: String,
    pub name: String,
    pub party: String,
    pub constituency: String,
    pub address: String,
    pub postcode: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Mp {
    pub id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: MpFields,
}

// ============ Screen payloads ============

/// Everything shown on the case detail screen.
#[derive(Debug, Clone, Serialize)]
pub struct CaseDetail {
    pub case: Case,
    pub comments: Vec<Comment>,
    pub assessment: Option<Assessment>,
    pub outcome: Option<Outcome>,
    pub internal_review: Option<InternalReview>,
    pub commissioner_appeal: Option<InformationCommissionerAppeal>,
    pub tribunal_appeal: Option<AdministrativeAppealsTribunal>,
}
