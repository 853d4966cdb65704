//! Submitted form data and field cleaning.
//!
//! Each screen receives a raw form where every field is optional text. A field
//! missing from the submission keeps its base value. The base is the stored
//! record on edit screens and the defaults on create screens. Cleaning either
//! yields the typed field set or a [`FormErrors`] map keyed by field name.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::choices::{
    Certificate, Choice, CorrespondenceMethod, DisclosureOutcome, DocumentDisposition, Exemption,
    FoiOutcome, ThirdPartyConsultationReason,
};
use crate::models::{
    AppealFields, AssessmentFields, CaseFields, CommentFields, InternalReviewFields, MpFields,
    OutcomeFields,
};

const REQUIRED: &str = "This field is required.";
const NULL_CHARACTER: &str = "Null characters are not allowed.";

/// Decimal columns are NUMERIC(10, 2).
const DECIMAL_MAX_DIGITS: i64 = 10;
const DECIMAL_PLACES: i64 = 2;
/// Exponents beyond this are out of range for any NUMERIC(10, 2) value.
const DECIMAL_MAX_EXPONENT: u64 = 64;

/// Field-level validation messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }
}

/// A form accepted by a create or edit screen.
pub trait ScreenForm {
    type Fields;

    /// Validates the submission against `base`, the values currently in effect.
    fn clean(&self, base: Self::Fields) -> Result<Self::Fields, FormErrors>;

    /// Choice lists offered by the form, keyed by field name.
    fn choices() -> Value {
        json!({})
    }
}

/// Accumulates errors while individual fields are cleaned.
#[derive(Debug, Default)]
pub struct Cleaner {
    errors: FormErrors,
}

impl Cleaner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounded single-line text. Blank is stored as the empty string.
    pub fn text(
        &mut self,
        field: &'static str,
        raw: Option<&str>,
        base: String,
        max_len: usize,
    ) -> String {
        let value = raw.map(|r| r.trim().to_string()).unwrap_or(base);
        if self.check_characters(field, &value) {
            self.check_length(field, &value, max_len);
        }
        value
    }

    pub fn required_text(
        &mut self,
        field: &'static str,
        raw: Option<&str>,
        base: String,
        max_len: usize,
    ) -> String {
        let value = raw.map(|r| r.trim().to_string()).unwrap_or(base);
        if value.is_empty() {
            self.errors.add(field, REQUIRED);
        } else if self.check_characters(field, &value) {
            self.check_length(field, &value, max_len);
        }
        value
    }

    /// Unbounded free text that may be absent.
    pub fn long_text(
        &mut self,
        field: &'static str,
        raw: Option<&str>,
        base: Option<String>,
    ) -> Option<String> {
        let value = match raw {
            Some(r) => {
                let trimmed = r.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            None => base,
        };
        if let Some(ref text) = value {
            self.check_characters(field, text);
        }
        value
    }

    pub fn required_long_text(
        &mut self,
        field: &'static str,
        raw: Option<&str>,
        base: String,
    ) -> String {
        let value = raw.map(|r| r.trim().to_string()).unwrap_or(base);
        if value.is_empty() {
            self.errors.add(field, REQUIRED);
        } else {
            self.check_characters(field, &value);
        }
        value
    }

    pub fn date(
        &mut self,
        field: &'static str,
        raw: Option<&str>,
        base: Option<NaiveDate>,
    ) -> Option<NaiveDate> {
        let Some(raw) = raw.map(str::trim) else {
            return base;
        };
        if raw.is_empty() {
            return None;
        }
        match parse_date(raw) {
            Some(date) => Some(date),
            None => {
                self.errors.add(field, "Enter a valid date.");
                base
            }
        }
    }

    pub fn decimal(
        &mut self,
        field: &'static str,
        raw: Option<&str>,
        base: Option<BigDecimal>,
    ) -> Option<BigDecimal> {
        let Some(raw) = raw.map(str::trim) else {
            return base;
        };
        if raw.is_empty() {
            return None;
        }
        let value = match BigDecimal::from_str(raw) {
            Ok(value) => value,
            Err(_) => {
                self.errors.add(field, "Enter a number.");
                return base;
            }
        };
        match decimal_error(&value) {
            Some(message) => {
                self.errors.add(field, message);
                base
            }
            None => Some(value),
        }
    }

    pub fn integer(
        &mut self,
        field: &'static str,
        raw: Option<&str>,
        base: Option<i32>,
    ) -> Option<i32> {
        let Some(raw) = raw.map(str::trim) else {
            return base;
        };
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<i32>() {
            Ok(value) => Some(value),
            Err(_) => {
                self.errors.add(field, "Enter a whole number.");
                base
            }
        }
    }

    /// Checkbox value. Absent keeps the base; see [`parse_flag`] for the rest.
    ///
    /// An unchecked browser checkbox is not submitted at all, so clearing a
    /// stored flag requires sending `off` or `0` explicitly.
    pub fn flag(&mut self, raw: Option<&str>, base: bool) -> bool {
        raw.map(parse_flag).unwrap_or(base)
    }

    pub fn choice<C: Choice>(
        &mut self,
        field: &'static str,
        raw: Option<&str>,
        base: Option<C>,
    ) -> Option<C> {
        let Some(raw) = raw.map(str::trim) else {
            return base;
        };
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<C>() {
            Ok(choice) => Some(choice),
            Err(_) => {
                self.errors.add(
                    field,
                    format!(
                        "Select a valid choice. {} is not one of the available choices.",
                        raw
                    ),
                );
                base
            }
        }
    }

    /// Returns `value` if no field failed.
    pub fn finish<T>(self, value: T) -> Result<T, FormErrors> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }

    /// PostgreSQL text cannot hold U+0000. Returns false if the value was rejected.
    fn check_characters(&mut self, field: &'static str, value: &str) -> bool {
        if value.contains('\0') {
            self.errors.add(field, NULL_CHARACTER);
            return false;
        }
        true
    }

    fn check_length(&mut self, field: &'static str, value: &str, max_len: usize) {
        let len = value.chars().count();
        if len > max_len {
            self.errors.add(
                field,
                format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    max_len, len
                ),
            );
        }
    }
}

/// Accepts ISO dates and the day-first form used on paper correspondence.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
}

pub fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "" | "false" | "0" | "off" | "no"
    )
}

fn decimal_error(value: &BigDecimal) -> Option<String> {
    let (unscaled, scale) = value.as_bigint_and_exponent();
    if scale.unsigned_abs() > DECIMAL_MAX_EXPONENT {
        return Some(format!(
            "Ensure that there are no more than {} digits in total.",
            DECIMAL_MAX_DIGITS
        ));
    }
    let digit_count = unscaled.to_string().trim_start_matches('-').len() as i64;
    let (digits, decimals) = if scale <= 0 {
        (digit_count - scale, 0)
    } else if scale > digit_count {
        (scale, scale)
    } else {
        (digit_count, scale)
    };
    let whole_digits = digits - decimals;

    if digits > DECIMAL_MAX_DIGITS {
        Some(format!(
            "Ensure that there are no more than {} digits in total.",
            DECIMAL_MAX_DIGITS
        ))
    } else if decimals > DECIMAL_PLACES {
        Some(format!(
            "Ensure that there are no more than {} decimal places.",
            DECIMAL_PLACES
        ))
    } else if whole_digits > DECIMAL_MAX_DIGITS - DECIMAL_PLACES {
        Some(format!(
            "Ensure that there are no more than {} digits before the decimal point.",
            DECIMAL_MAX_DIGITS - DECIMAL_PLACES
        ))
    } else {
        None
    }
}

// ============ Case ============

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CaseForm {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub received_date: Option<String>,
    pub enquiry_date: Option<String>,
    pub enquiry_ref: Option<String>,
    pub enquiry_method: Option<String>,
    pub response_method: Option<String>,
    pub enquiry_description: Option<String>,
    pub urgent_flag: Option<String>,
    pub handling_instructions: Option<String>,
    pub addressee_name: Option<String>,
}

impl ScreenForm for CaseForm {
    type Fields = CaseFields;

    fn clean(&self, base: CaseFields) -> Result<CaseFields, FormErrors> {
        let mut c = Cleaner::new();
        let fields = CaseFields {
            title: c.required_text("title", self.title.as_deref(), base.title, 100),
            subject: c.text("subject", self.subject.as_deref(), base.subject, 250),
            received_date: c.date(
                "received_date",
                self.received_date.as_deref(),
                base.received_date,
            ),
            enquiry_date: c.date(
                "enquiry_date",
                self.enquiry_date.as_deref(),
                base.enquiry_date,
            ),
            enquiry_ref: c.text(
                "enquiry_ref",
                self.enquiry_ref.as_deref(),
                base.enquiry_ref,
                50,
            ),
            enquiry_method: c.choice(
                "enquiry_method",
                self.enquiry_method.as_deref(),
                base.enquiry_method,
            ),
            response_method: c.choice(
                "response_method",
                self.response_method.as_deref(),
                base.response_method,
            ),
            enquiry_description: c.text(
                "enquiry_description",
                self.enquiry_description.as_deref(),
                base.enquiry_description,
                200,
            ),
            urgent_flag: c.flag(self.urgent_flag.as_deref(), base.urgent_flag),
            handling_instructions: c.text(
                "handling_instructions",
                self.handling_instructions.as_deref(),
                base.handling_instructions,
                200,
            ),
            addressee_name: c.text(
                "addressee_name",
                self.addressee_name.as_deref(),
                base.addressee_name,
                100,
            ),
        };
        c.finish(fields)
    }

    fn choices() -> Value {
        json!({
            "enquiry_method": CorrespondenceMethod::options(),
            "response_method": CorrespondenceMethod::options(),
        })
    }
}

// ============ Comment ============

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CommentForm {
    pub subject: Option<String>,
    pub body: Option<String>,
}

impl ScreenForm for CommentForm {
    type Fields = CommentFields;

    fn clean(&self, base: CommentFields) -> Result<CommentFields, FormErrors> {
        let mut c = Cleaner::new();
        let fields = CommentFields {
            subject: c.required_text("subject", self.subject.as_deref(), base.subject, 100),
            body: c.required_long_text("body", self.body.as_deref(), base.body),
        };
        c.finish(fields)
    }
}

// ============ Assessment ============

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AssessmentForm {
    pub third_party_consultation: Option<String>,
    pub precedents: Option<String>,
    pub precedent_details: Option<String>,
    pub fee_flag: Option<String>,
    pub search_and_retrieval_time: Option<String>,
    pub decision_making_time: Option<String>,
    pub photocopy_charges: Option<String>,
    pub other_access_time: Option<String>,
    pub postage_charges: Option<String>,
    pub initial_deposit: Option<String>,
    pub request_general_description: Option<String>,
    pub include_refine_request_flag: Option<String>,
    pub include_third_party_consultation_flag: Option<String>,
    pub request_concerning: Option<String>,
    pub contact_name: Option<String>,
    pub contact_telephone: Option<String>,
    pub fee_notice_issued_flag: Option<String>,
    pub fee_notice_issued_date: Option<String>,
    pub fee_payment_required_date: Option<String>,
    pub fee_paid_flag: Option<String>,
    pub fee_received_date: Option<String>,
    pub fee_limit_flag: Option<String>,
    pub third_party_request_general_description: Option<String>,
    pub documents_attached_or_described: Option<String>,
    pub include_s47_flag: Option<String>,
    pub include_s47b_flag: Option<String>,
    pub include_s47f_flag: Option<String>,
    pub include_s47g_flag: Option<String>,
    pub respond_by_date: Option<String>,
    pub third_party_contact_name: Option<String>,
    pub third_party_contact_telephone: Option<String>,
    pub third_party_title: Option<String>,
    pub third_party_name: Option<String>,
    pub third_party_department: Option<String>,
    pub third_party_organisation: Option<String>,
    pub third_party_address: Option<String>,
    pub third_party_postcode: Option<String>,
}

impl ScreenForm for AssessmentForm {
    type Fields = AssessmentFields;

    fn clean(&self, base: AssessmentFields) -> Result<AssessmentFields, FormErrors> {
        let mut c = Cleaner::new();
        let fields = AssessmentFields {
            third_party_consultation: c.flag(
                self.third_party_consultation.as_deref(),
                base.third_party_consultation,
            ),
            precedents: c.flag(self.precedents.as_deref(), base.precedents),
            precedent_details: c.long_text(
                "precedent_details",
                self.precedent_details.as_deref(),
                base.precedent_details,
            ),
            fee_flag: c.flag(self.fee_flag.as_deref(), base.fee_flag),
            search_and_retrieval_time: c.decimal(
                "search_and_retrieval_time",
                self.search_and_retrieval_time.as_deref(),
                base.search_and_retrieval_time,
            ),
            decision_making_time: c.decimal(
                "decision_making_time",
                self.decision_making_time.as_deref(),
                base.decision_making_time,
            ),
            photocopy_charges: c.decimal(
                "photocopy_charges",
                self.photocopy_charges.as_deref(),
                base.photocopy_charges,
            ),
            other_access_time: c.decimal(
                "other_access_time",
                self.other_access_time.as_deref(),
                base.other_access_time,
            ),
            postage_charges: c.decimal(
                "postage_charges",
                self.postage_charges.as_deref(),
                base.postage_charges,
            ),
            initial_deposit: c.decimal(
                "initial_deposit",
                self.initial_deposit.as_deref(),
                base.initial_deposit,
            ),
            request_general_description: c.text(
                "request_general_description",
                self.request_general_description.as_deref(),
                base.request_general_description,
                100,
            ),
            include_refine_request_flag: c.flag(
                self.include_refine_request_flag.as_deref(),
                base.include_refine_request_flag,
            ),
            include_third_party_consultation_flag: c.flag(
                self.include_third_party_consultation_flag.as_deref(),
                base.include_third_party_consultation_flag,
            ),
            request_concerning: c.choice(
                "request_concerning",
                self.request_concerning.as_deref(),
                base.request_concerning,
            ),
            contact_name: c.text(
                "contact_name",
                self.contact_name.as_deref(),
                base.contact_name,
                100,
            ),
            contact_telephone: c.text(
                "contact_telephone",
                self.contact_telephone.as_deref(),
                base.contact_telephone,
                30,
            ),
            fee_notice_issued_flag: c.flag(
                self.fee_notice_issued_flag.as_deref(),
                base.fee_notice_issued_flag,
            ),
            fee_notice_issued_date: c.date(
                "fee_notice_issued_date",
                self.fee_notice_issued_date.as_deref(),
                base.fee_notice_issued_date,
            ),
            fee_payment_required_date: c.date(
                "fee_payment_required_date",
                self.fee_payment_required_date.as_deref(),
                base.fee_payment_required_date,
            ),
            fee_paid_flag: c.flag(self.fee_paid_flag.as_deref(), base.fee_paid_flag),
            fee_received_date: c.date(
                "fee_received_date",
                self.fee_received_date.as_deref(),
                base.fee_received_date,
            ),
            fee_limit_flag: c.flag(self.fee_limit_flag.as_deref(), base.fee_limit_flag),
            third_party_request_general_description: c.text(
                "third_party_request_general_description",
                self.third_party_request_general_description.as_deref(),
                base.third_party_request_general_description,
                100,
            ),
            documents_attached_or_described: c.choice(
                "documents_attached_or_described",
                self.documents_attached_or_described.as_deref(),
                base.documents_attached_or_described,
            ),
            include_s47_flag: c.flag(self.include_s47_flag.as_deref(), base.include_s47_flag),
            include_s47b_flag: c.flag(self.include_s47b_flag.as_deref(), base.include_s47b_flag),
            include_s47f_flag: c.flag(self.include_s47f_flag.as_deref(), base.include_s47f_flag),
            include_s47g_flag: c.flag(self.include_s47g_flag.as_deref(), base.include_s47g_flag),
            respond_by_date: c.date(
                "respond_by_date",
                self.respond_by_date.as_deref(),
                base.respond_by_date,
            ),
            third_party_contact_name: c.text(
                "third_party_contact_name",
                self.third_party_contact_name.as_deref(),
                base.third_party_contact_name,
                100,
            ),
            third_party_contact_telephone: c.text(
                "third_party_contact_telephone",
                self.third_party_contact_telephone.as_deref(),
                base.third_party_contact_telephone,
                30,
            ),
            third_party_title: c.text(
                "third_party_title",
                self.third_party_title.as_deref(),
                base.third_party_title,
                20,
            ),
            third_party_name: c.text(
                "third_party_name",
                self.third_party_name.as_deref(),
                base.third_party_name,
                100,
            ),
            third_party_department: c.text(
                "third_party_department",
                self.third_party_department.as_deref(),
                base.third_party_department,
                100,
            ),
            third_party_organisation: c.text(
                "third_party_organisation",
                self.third_party_organisation.as_deref(),
                base.third_party_organisation,
                100,
            ),
            third_party_address: c.text(
                "third_party_address",
                self.third_party_address.as_deref(),
                base.third_party_address,
                400,
            ),
            third_party_postcode: c.text(
                "third_party_postcode",
                self.third_party_postcode.as_deref(),
                base.third_party_postcode,
                10,
            ),
        };
        c.finish(fields)
    }

    fn choices() -> Value {
        json!({
            "request_concerning": ThirdPartyConsultationReason::options(),
            "documents_attached_or_described": DocumentDisposition::options(),
        })
    }
}

// ============ Outcome ============

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutcomeForm {
    pub foi_outcome: Option<String>,
    pub foi_exemption: Option<String>,
    pub foi_conditional_exemption: Option<String>,
    pub disclosure_outcome: Option<String>,
    pub certificate: Option<String>,
}

impl ScreenForm for OutcomeForm {
    type Fields = OutcomeFields;

    fn clean(&self, base: OutcomeFields) -> Result<OutcomeFields, FormErrors> {
        let mut c = Cleaner::new();
        let fields = OutcomeFields {
            foi_outcome: c.choice("foi_outcome", self.foi_outcome.as_deref(), base.foi_outcome),
            foi_exemption: c.choice(
                "foi_exemption",
                self.foi_exemption.as_deref(),
                base.foi_exemption,
            ),
            foi_conditional_exemption: c.choice(
                "foi_conditional_exemption",
                self.foi_conditional_exemption.as_deref(),
                base.foi_conditional_exemption,
            ),
            disclosure_outcome: c.choice(
                "disclosure_outcome",
                self.disclosure_outcome.as_deref(),
                base.disclosure_outcome,
            ),
            certificate: c.choice("certificate", self.certificate.as_deref(), base.certificate),
        };
        c.finish(fields)
    }

    fn choices() -> Value {
        json!({
            "foi_outcome": FoiOutcome::options(),
            "foi_exemption": Exemption::options(),
            "foi_conditional_exemption": Exemption::options(),
            "disclosure_outcome": DisclosureOutcome::options(),
            "certificate": Certificate::options(),
        })
    }
}

// ============ Escalation stages ============

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InternalReviewForm {
    pub requested_date: Option<String>,
    pub review_held_date: Option<String>,
    pub days_taken_to_hold_review: Option<String>,
    pub review_members: Option<String>,
    pub review_decision: Option<String>,
}

impl ScreenForm for InternalReviewForm {
    type Fields = InternalReviewFields;

    fn clean(&self, base: InternalReviewFields) -> Result<InternalReviewFields, FormErrors> {
        let mut c = Cleaner::new();
        let fields = InternalReviewFields {
            requested_date: c.date(
                "requested_date",
                self.requested_date.as_deref(),
                base.requested_date,
            ),
            review_held_date: c.date(
                "review_held_date",
                self.review_held_date.as_deref(),
                base.review_held_date,
            ),
            days_taken_to_hold_review: c.integer(
                "days_taken_to_hold_review",
                self.days_taken_to_hold_review.as_deref(),
                base.days_taken_to_hold_review,
            ),
            review_members: c.long_text(
                "review_members",
                self.review_members.as_deref(),
                base.review_members,
            ),
            review_decision: c.long_text(
                "review_decision",
                self.review_decision.as_deref(),
                base.review_decision,
            ),
        };
        c.finish(fields)
    }
}

/// Shared by the Information Commissioner and Tribunal appeal screens.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppealForm {
    pub contacted_date: Option<String>,
    pub documents_provided_date: Option<String>,
    pub decision_received_date: Option<String>,
    pub decision: Option<String>,
    pub decision_notice: Option<String>,
}

impl ScreenForm for AppealForm {
    type Fields = AppealFields;

    fn clean(&self, base: AppealFields) -> Result<AppealFields, FormErrors> {
        let mut c = Cleaner::new();
        let fields = AppealFields {
            contacted_date: c.date(
                "contacted_date",
                self.contacted_date.as_deref(),
                base.contacted_date,
            ),
            documents_provided_date: c.date(
                "documents_provided_date",
                self.documents_provided_date.as_deref(),
                base.documents_provided_date,
            ),
            decision_received_date: c.date(
                "decision_received_date",
                self.decision_received_date.as_deref(),
                base.decision_received_date,
            ),
            decision: c.long_text("decision", self.decision.as_deref(), base.decision),
            decision_notice: c.text(
                "decision_notice",
                self.decision_notice.as_deref(),
                base.decision_notice,
                100,
            ),
        };
        c.finish(fields)
    }
}

// ============ MP ============

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MpForm {
    pub title: Option<String>,
    pub name: Option<String>,
    pub party: Option<String>,
    pub constituency: Option<String>,
    pub address: Option<String>,
    pub postcode: Option<String>,
}

impl ScreenForm for MpForm {
    type Fields = MpFields;

    fn clean(&self, base: MpFields) -> Result<MpFields, FormErrors> {
        let mut c = Cleaner::new();
        let fields = MpFields {
            title: c.required_text("title", self.title.as_deref(), base.title, 20),
            name: c.required_text("name", self.name.as_deref(), base.name, 100),
            party: c.required_text("party", self.party.as_deref(), base.party, 100),
            constituency: c.required_text(
                "constituency",
                self.constituency.as_deref(),
                base.constituency,
                100,
            ),
            address: c.required_text("address", self.address.as_deref(), base.address, 400),
            postcode: c.required_text("postcode", self.postcode.as_deref(), base.postcode, 10),
        };
        c.finish(fields)
    }
}
