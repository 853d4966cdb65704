use chrono::Utc;
use sqlx::{
    postgres::{PgArguments, PgRow},
    query::QueryAs,
    FromRow, PgConnection, PgPool, Postgres,
};
use uuid::Uuid;

use crate::auth::ActingUser;
use crate::errors::{AppError, ResultExt};
use crate::models::{
    AdministrativeAppealsTribunal, AppealFields, Assessment, AssessmentFields, Case, CaseFields,
    Comment, CommentFields, InformationCommissionerAppeal, InternalReview, InternalReviewFields,
    Mp, MpFields, Outcome, OutcomeFields,
};

/// Makes sure the acting user has a row for `created_by` to reference.
async fn record_user(conn: &mut PgConnection, user: &ActingUser) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO users (username, first_seen) VALUES ($1, now()) ON CONFLICT (username) DO NOTHING",
    )
    .bind(&user.username)
    .execute(conn)
    .await
    .context("Recording acting user")?;
    Ok(())
}

// ============ Cases ============

pub struct CaseStorage {
    pool: PgPool,
}

impl CaseStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Case factory. `created_date` and `created_by` always come from the server.
    pub async fn create_case(
        &self,
        fields: &CaseFields,
        user: &ActingUser,
    ) -> Result<Case, AppError> {
        let mut tx = self.pool.begin().await?;
        record_user(&mut tx, user).await?;

        let case = sqlx::query_as::<_, Case>(
            r#"
            INSERT INTO cases
            (id, title, subject, received_date, enquiry_date, enquiry_ref, enquiry_method,
             response_method, enquiry_description, urgent_flag, handling_instructions,
             addressee_name, created_date, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&fields.title)
        .bind(&fields.subject)
        .bind(fields.received_date)
        .bind(fields.enquiry_date)
        .bind(&fields.enquiry_ref)
        .bind(fields.enquiry_method)
        .bind(fields.response_method)
        .bind(&fields.enquiry_description)
        .bind(fields.urgent_flag)
        .bind(&fields.handling_instructions)
        .bind(&fields.addressee_name)
        .bind(Utc::now())
        .bind(&user.username)
        .fetch_one(&mut *tx)
        .await
        .context("Inserting case")?;

        tx.commit().await?;

        tracing::info!("Created case {} by {}", case.id, case.created_by);
        Ok(case)
    }

    /// All cases, newest first.
    pub async fn list_cases(&self) -> Result<Vec<Case>, AppError> {
        sqlx::query_as::<_, Case>("SELECT * FROM cases ORDER BY created_date DESC, id")
            .fetch_all(&self.pool)
            .await
            .context("Listing cases")
    }

    pub async fn get_case(&self, id: Uuid) -> Result<Case, AppError> {
        sqlx::query_as::<_, Case>("SELECT * FROM cases WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Case with id {} not found", id)))
    }

    pub async fn update_case(&self, id: Uuid, fields: &CaseFields) -> Result<Case, AppError> {
        let case = sqlx::query_as::<_, Case>(
            r#"
            UPDATE cases
            SET title = $2,
                subject = $3,
                received_date = $4,
                enquiry_date = $5,
                enquiry_ref = $6,
                enquiry_method = $7,
                response_method = $8,
                enquiry_description = $9,
                urgent_flag = $10,
                handling_instructions = $11,
                addressee_name = $12
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&fields.title)
        .bind(&fields.subject)
        .bind(fields.received_date)
        .bind(fields.enquiry_date)
        .bind(&fields.enquiry_ref)
        .bind(fields.enquiry_method)
        .bind(fields.response_method)
        .bind(&fields.enquiry_description)
        .bind(fields.urgent_flag)
        .bind(&fields.handling_instructions)
        .bind(&fields.addressee_name)
        .fetch_optional(&self.pool)
        .await
        .context("Updating case")?
        .ok_or_else(|| AppError::NotFound(format!("Case with id {} not found", id)))?;

        tracing::info!("Updated case {}", id);
        Ok(case)
    }

    /// Removes the case. Comments and per-case records go with it (FK cascade).
    pub async fn delete_case(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM cases WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Deleting case")?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Case with id {} not found", id)));
        }

        tracing::info!("Deleted case {}", id);
        Ok(())
    }
}

// ============ Comments ============

pub struct CommentStorage {
    pool: PgPool,
}

impl CommentStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Comment factory, stamped like cases.
    pub async fn create_comment(
        &self,
        case_id: Uuid,
        fields: &CommentFields,
        user: &ActingUser,
    ) -> Result<Comment, AppError> {
        let mut tx = self.pool.begin().await?;
        record_user(&mut tx, user).await?;

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, case_id, subject, body, created_date, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(case_id)
        .bind(&fields.subject)
        .bind(&fields.body)
        .bind(Utc::now())
        .bind(&user.username)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("Inserting comment on case {}", case_id))?;

        tx.commit().await?;

        tracing::info!("Created comment {} on case {}", comment.id, case_id);
        Ok(comment)
    }

    /// Comments on a case, oldest first.
    pub async fn list_for_case(&self, case_id: Uuid) -> Result<Vec<Comment>, AppError> {
        sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments WHERE case_id = $1 ORDER BY created_date, id",
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await
        .context("Listing comments")
    }

    pub async fn get_comment(&self, case_id: Uuid, id: Uuid) -> Result<Comment, AppError> {
        sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1 AND case_id = $2")
            .bind(id)
            .bind(case_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment with id {} not found", id)))
    }

    pub async fn update_comment(
        &self,
        case_id: Uuid,
        id: Uuid,
        fields: &CommentFields,
    ) -> Result<Comment, AppError> {
        sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments SET subject = $3, body = $4
            WHERE id = $1 AND case_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(case_id)
        .bind(&fields.subject)
        .bind(&fields.body)
        .fetch_optional(&self.pool)
        .await
        .context("Updating comment")?
        .ok_or_else(|| AppError::NotFound(format!("Comment with id {} not found", id)))
    }

    pub async fn delete_comment(&self, case_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1 AND case_id = $2")
            .bind(id)
            .bind(case_id)
            .execute(&self.pool)
            .await
            .context("Deleting comment")?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Comment with id {} not found", id)));
        }

        tracing::info!("Deleted comment {} from case {}", id, case_id);
        Ok(())
    }
}

// ============ One-per-case records ============

pub type RecordQuery<'q, R> = QueryAs<'q, Postgres, R, PgArguments>;

/// A record of which each case holds at most one (`UNIQUE (case_id)`).
pub trait CaseRecord: for<'r> FromRow<'r, PgRow> + Send + Unpin + 'static {
    type Fields: Clone + Send + Sync + 'static;

    const TABLE: &'static str;
    const LABEL: &'static str;
    /// `SET` list for an update; `$1` is the case id.
    const UPDATE_SET: &'static str;

    fn fields(&self) -> &Self::Fields;

    /// Binds `fields` in `UPDATE_SET` order, starting at `$2`.
    fn bind_fields<'q>(query: RecordQuery<'q, Self>, fields: &'q Self::Fields)
        -> RecordQuery<'q, Self>;
}

impl CaseRecord for Assessment {
    type Fields = AssessmentFields;

    const TABLE: &'static str = "assessments";
    const LABEL: &'static str = "Assessment";
    const UPDATE_SET: &'static str = r#"
        third_party_consultation = $2,
        precedents = $3,
        precedent_details = $4,
        fee_flag = $5,
        search_and_retrieval_time = $6,
        decision_making_time = $7,
        photocopy_charges = $8,
        other_access_time = $9,
        postage_charges = $10,
        initial_deposit = $11,
        request_general_description = $12,
        include_refine_request_flag = $13,
        include_third_party_consultation_flag = $14,
        request_concerning = $15,
        contact_name = $16,
        contact_telephone = $17,
        fee_notice_issued_flag = $18,
        fee_notice_issued_date = $19,
        fee_payment_required_date = $20,
        fee_paid_flag = $21,
        fee_received_date = $22,
        fee_limit_flag = $23,
        third_party_request_general_description = $24,
        documents_attached_or_described = $25,
        include_s47_flag = $26,
        include_s47b_flag = $27,
        include_s47f_flag = $28,
        include_s47g_flag = $29,
        respond_by_date = $30,
        third_party_contact_name = $31,
        third_party_contact_telephone = $32,
        third_party_title = $33,
        third_party_name = $34,
        third_party_department = $35,
        third_party_organisation = $36,
        third_party_address = $37,
        third_party_postcode = $38
    "#;

    fn fields(&self) -> &AssessmentFields {
        &self.fields
    }

    fn bind_fields<'q>(
        query: RecordQuery<'q, Self>,
        f: &'q AssessmentFields,
    ) -> RecordQuery<'q, Self> {
        query
            .bind(f.third_party_consultation)
            .bind(f.precedents)
            .bind(&f.precedent_details)
            .bind(f.fee_flag)
            .bind(&f.search_and_retrieval_time)
            .bind(&f.decision_making_time)
            .bind(&f.photocopy_charges)
            .bind(&f.other_access_time)
            .bind(&f.postage_charges)
            .bind(&f.initial_deposit)
            .bind(&f.request_general_description)
            .bind(f.include_refine_request_flag)
            .bind(f.include_third_party_consultation_flag)
            .bind(f.request_concerning)
            .bind(&f.contact_name)
            .bind(&f.contact_telephone)
            .bind(f.fee_notice_issued_flag)
            .bind(f.fee_notice_issued_date)
            .bind(f.fee_payment_required_date)
            .bind(f.fee_paid_flag)
            .bind(f.fee_received_date)
            .bind(f.fee_limit_flag)
            .bind(&f.third_party_request_general_description)
            .bind(f.documents_attached_or_described)
            .bind(f.include_s47_flag)
            .bind(f.include_s47b_flag)
            .bind(f.include_s47f_flag)
            .bind(f.include_s47g_flag)
            .bind(f.respond_by_date)
            .bind(&f.third_party_contact_name)
            .bind(&f.third_party_contact_telephone)
            .bind(&f.third_party_title)
            .bind(&f.third_party_name)
            .bind(&f.third_party_department)
            .bind(&f.third_party_organisation)
            .bind(&f.third_party_address)
            .bind(&f.third_party_postcode)
    }
}

impl CaseRecord for Outcome {
    type Fields = OutcomeFields;

    const TABLE: &'static str = "outcomes";
    const LABEL: &'static str = "Outcome";
    const UPDATE_SET: &'static str = r#"
        foi_outcome = $2,
        foi_exemption = $3,
        foi_conditional_exemption = $4,
        disclosure_outcome = $5,
        certificate = $6
    "#;

    fn fields(&self) -> &OutcomeFields {
        &self.fields
    }

    fn bind_fields<'q>(query: RecordQuery<'q, Self>, f: &'q OutcomeFields) -> RecordQuery<'q, Self> {
        query
            .bind(f.foi_outcome)
            .bind(f.foi_exemption)
            .bind(f.foi_conditional_exemption)
            .bind(f.disclosure_outcome)
            .bind(f.certificate)
    }
}

impl CaseRecord for InternalReview {
    type Fields = InternalReviewFields;

    const TABLE: &'static str = "internal_reviews";
    const LABEL: &'static str = "Internal review";
    const UPDATE_SET: &'static str = r#"
        requested_date = $2,
        review_held_date = $3,
        days_taken_to_hold_review = $4,
        review_members = $5,
        review_decision = $6
    "#;

    fn fields(&self) -> &InternalReviewFields {
        &self.fields
    }

    fn bind_fields<'q>(
        query: RecordQuery<'q, Self>,
        f: &'q InternalReviewFields,
    ) -> RecordQuery<'q, Self> {
        query
            .bind(f.requested_date)
            .bind(f.review_held_date)
            .bind(f.days_taken_to_hold_review)
            .bind(&f.review_members)
            .bind(&f.review_decision)
    }
}

const APPEAL_UPDATE_SET: &str = r#"
    contacted_date = $2,
    documents_provided_date = $3,
    decision_received_date = $4,
    decision = $5,
    decision_notice = $6
"#;

fn bind_appeal_fields<'q, R>(query: RecordQuery<'q, R>, f: &'q AppealFields) -> RecordQuery<'q, R> {
    query
        .bind(f.contacted_date)
        .bind(f.documents_provided_date)
        .bind(f.decision_received_date)
        .bind(&f.decision)
        .bind(&f.decision_notice)
}

impl CaseRecord for InformationCommissionerAppeal {
    type Fields = AppealFields;

    const TABLE: &'static str = "commissioner_appeals";
    const LABEL: &'static str = "Information Commissioner appeal";
    const UPDATE_SET: &'static str = APPEAL_UPDATE_SET;

    fn fields(&self) -> &AppealFields {
        &self.fields
    }

    fn bind_fields<'q>(query: RecordQuery<'q, Self>, f: &'q AppealFields) -> RecordQuery<'q, Self> {
        bind_appeal_fields(query, f)
    }
}

impl CaseRecord for AdministrativeAppealsTribunal {
    type Fields = AppealFields;

    const TABLE: &'static str = "tribunal_appeals";
    const LABEL: &'static str = "Administrative Appeals Tribunal appeal";
    const UPDATE_SET: &'static str = APPEAL_UPDATE_SET;

    fn fields(&self) -> &AppealFields {
        &self.fields
    }

    fn bind_fields<'q>(query: RecordQuery<'q, Self>, f: &'q AppealFields) -> RecordQuery<'q, Self> {
        bind_appeal_fields(query, f)
    }
}

/// Storage for assessments, outcomes, reviews and appeals.
pub struct CaseRecordStorage {
    pool: PgPool,
}

impl CaseRecordStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Factory: creates the case's record with every field at its default.
    ///
    /// Fails with `Conflict` if the case already has one.
    pub async fn create<R: CaseRecord>(&self, case_id: Uuid) -> Result<R, AppError> {
        let sql = format!(
            "INSERT INTO {} (id, case_id) VALUES ($1, $2) RETURNING *",
            R::TABLE
        );
        let record = sqlx::query_as::<_, R>(&sql)
            .bind(Uuid::new_v4())
            .bind(case_id)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Creating {} for case {}", R::LABEL, case_id))?;

        tracing::info!("Created {} for case {}", R::LABEL, case_id);
        Ok(record)
    }

    pub async fn find<R: CaseRecord>(&self, case_id: Uuid) -> Result<Option<R>, AppError> {
        let sql = format!("SELECT * FROM {} WHERE case_id = $1", R::TABLE);
        sqlx::query_as::<_, R>(&sql)
            .bind(case_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Loading {} for case {}", R::LABEL, case_id))
    }

    /// Returns the case's record, creating it first if needed.
    ///
    /// Concurrent first visits converge on a single row.
    pub async fn get_or_create<R: CaseRecord>(&self, case_id: Uuid) -> Result<R, AppError> {
        let insert = format!(
            "INSERT INTO {} (id, case_id) VALUES ($1, $2) ON CONFLICT (case_id) DO NOTHING",
            R::TABLE
        );
        let inserted = sqlx::query(&insert)
            .bind(Uuid::new_v4())
            .bind(case_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Creating {} for case {}", R::LABEL, case_id))?;

        if inserted.rows_affected() > 0 {
            tracing::info!("Created {} for case {}", R::LABEL, case_id);
        }

        self.find::<R>(case_id).await?.ok_or_else(|| {
            AppError::InternalError(format!("{} for case {} vanished", R::LABEL, case_id))
        })
    }

    pub async fn update<R: CaseRecord>(
        &self,
        case_id: Uuid,
        fields: &R::Fields,
    ) -> Result<R, AppError> {
        let sql = format!(
            "UPDATE {} SET {} WHERE case_id = $1 RETURNING *",
            R::TABLE,
            R::UPDATE_SET
        );
        let query = sqlx::query_as::<_, R>(&sql).bind(case_id);
        let record = R::bind_fields(query, fields)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Updating {} for case {}", R::LABEL, case_id))?
            .ok_or_else(|| {
                AppError::NotFound(format!("{} for case {} not found", R::LABEL, case_id))
            })?;

        tracing::info!("Updated {} for case {}", R::LABEL, case_id);
        Ok(record)
    }
}

// ============ MPs ============

pub struct MpStorage {
    pool: PgPool,
}

impl MpStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// MP factory.
    pub async fn create_mp(&self, fields: &MpFields) -> Result<Mp, AppError> {
        let mp = sqlx::query_as::<_, Mp>(
            r#"
            INSERT INTO mps (id, title, name, party, constituency, address, postcode)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&fields.title)
        .bind(&fields.name)
        .bind(&fields.party)
        .bind(&fields.constituency)
        .bind(&fields.address)
        .bind(&fields.postcode)
        .fetch_one(&self.pool)
        .await
        .context("Inserting MP")?;

        tracing::info!("Created MP {} ({})", mp.id, mp.fields.name);
        Ok(mp)
    }

    /// The reference list, alphabetical by name.
    pub async fn list_mps(&self) -> Result<Vec<Mp>, AppError> {
        sqlx::query_as::<_, Mp>("SELECT * FROM mps ORDER BY name, id")
            .fetch_all(&self.pool)
            .await
            .context("Listing MPs")
    }

    pub async fn get_mp(&self, id: Uuid) -> Result<Mp, AppError> {
        sqlx::query_as::<_, Mp>("SELECT * FROM mps WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("MP with id {} not found", id)))
    }

    pub async fn update_mp(&self, id: Uuid, fields: &MpFields) -> Result<Mp, AppError> {
        let mp = sqlx::query_as::<_, Mp>(
            r#"
            UPDATE mps
            SET title = $2, name = $3, party = $4, constituency = $5, address = $6, postcode = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&fields.title)
        .bind(&fields.name)
        .bind(&fields.party)
        .bind(&fields.constituency)
        .bind(&fields.address)
        .bind(&fields.postcode)
        .fetch_optional(&self.pool)
        .await
        .context("Updating MP")?
        .ok_or_else(|| AppError::NotFound(format!("MP with id {} not found", id)))?;

        tracing::info!("Updated MP {}", id);
        Ok(mp)
    }

    pub async fn delete_mp(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM mps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Deleting MP")?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("MP with id {} not found", id)));
        }

        tracing::info!("Deleted MP {}", id);
        Ok(())
    }
}
