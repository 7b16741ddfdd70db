//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Credit accounts, one per signed-in user.
    users (id) {
        /// Primary key, the session user id.
        id -> Uuid,
        /// Balance; a check constraint keeps it non-negative.
        credits -> Int4,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last balance change.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Generation aggregates. `status` doubles as the run lock.
    generations (id) {
        /// Caller-supplied opaque identifier.
        id -> Varchar,
        /// Owning user.
        user_id -> Uuid,
        /// Style fixed by the first entry.
        style -> Nullable<Varchar>,
        /// `PUBLIC` or `PRIVATE`.
        visibility -> Varchar,
        /// `IDLE` or `IN_PROGRESS`.
        status -> Varchar,
        /// Token of the run holding the lock; set only while in progress.
        lock_token -> Nullable<Uuid>,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Bumped on every lock transition and commit.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only generation results.
    generation_entries (id) {
        /// Primary key.
        id -> Uuid,
        /// Parent generation.
        generation_id -> Varchar,
        /// Override prompt, null for the first pass.
        prompt -> Nullable<Text>,
        /// Durable image location.
        image_url -> Text,
        /// Record creation timestamp; defines entry order.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Purchasable credit bundles.
    credit_packages (id) {
        /// Primary key.
        id -> Uuid,
        /// Credits granted.
        credits -> Int4,
        /// Extra credits granted.
        bonus -> Int4,
        /// Price in cents.
        price_cents -> Int4,
    }
}

diesel::joinable!(generations -> users (user_id));
diesel::joinable!(generation_entries -> generations (generation_id));

diesel::allow_tables_to_appear_in_same_query!(
    credit_packages,
    generation_entries,
    generations,
    users,
);
