//! Diesel table definitions for the show database.

diesel::table! {
    tasks (id) {
        id -> Text,
        seq -> Int8,
        worker -> Text,
        worker_id -> Text,
        task_type -> Text,
        description -> Text,
        priority -> Int4,
        input_refs -> Jsonb,
        status -> Text,
        output_destination -> Nullable<Text>,
        output_record_id -> Nullable<Int8>,
        rejection_reason -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    entities (id) {
        id -> Int8,
        name -> Text,
        description -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    canon_facts (id) {
        id -> Int8,
        fact -> Text,
        entity_id -> Nullable<Int8>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    canon_rules (id) {
        id -> Int8,
        rule -> Text,
    }
}

diesel::table! {
    conflicts (id) {
        id -> Int8,
        title -> Text,
        side_a -> Text,
        side_b -> Text,
        intensity -> Int4,
        status -> Text,
        resolution -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    blueprints (id) {
        id -> Int8,
        entity_id -> Nullable<Int8>,
        title -> Text,
        visual_prompt -> Text,
        style -> Nullable<Text>,
        status -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    teasers (id) {
        id -> Int8,
        entity_id -> Nullable<Int8>,
        content -> Text,
        speaker -> Nullable<Text>,
        tone -> Nullable<Text>,
        priority -> Int4,
        status -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    scripts (id) {
        id -> Int8,
        title -> Text,
        synopsis -> Nullable<Text>,
        shots -> Jsonb,
        status -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    episodes (id) {
        id -> Int8,
        title -> Text,
        video_url -> Nullable<Text>,
        published_at -> Timestamptz,
    }
}

diesel::table! {
    heartbeats (worker_id) {
        worker_id -> Text,
        worker_name -> Text,
        status -> Text,
        detail -> Nullable<Text>,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    audit_log (id) {
        id -> Int8,
        category -> Text,
        action -> Text,
        allowed -> Bool,
        reason -> Nullable<Text>,
        digest -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    tasks,
    entities,
    canon_facts,
    canon_rules,
    conflicts,
    blueprints,
    teasers,
    scripts,
    episodes,
    heartbeats,
    audit_log,
);
