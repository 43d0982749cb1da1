diesel::table! {
    accounts (id) {
        id -> Uuid,
        email -> Text,
        password_hash -> Text,
        role -> Text,
        manager_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    origins (id) {
        id -> Uuid,
        name -> Text,
        description -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    pipeline_stages (id) {
        id -> Uuid,
        origin_id -> Uuid,
        name -> Text,
        color -> Varchar,
        order_num -> Int4,
    }
}

diesel::table! {
    contacts (id) {
        id -> Uuid,
        name -> Text,
        email -> Nullable<Text>,
        phone -> Nullable<Text>,
        owning_user_id -> Uuid,
        manager_id -> Nullable<Uuid>,
        stage_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    origin_members (origin_id, user_id) {
        origin_id -> Uuid,
        user_id -> Uuid,
        role -> Text,
    }
}

diesel::table! {
    contact_origins (contact_id, origin_id) {
        contact_id -> Uuid,
        origin_id -> Uuid,
    }
}

diesel::table! {
    tags (id) {
        id -> Uuid,
        name -> Text,
        created_by -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    contact_tags (contact_id, tag_id) {
        contact_id -> Uuid,
        tag_id -> Uuid,
    }
}

diesel::joinable!(pipeline_stages -> origins (origin_id));
diesel::joinable!(contact_origins -> contacts (contact_id));
diesel::joinable!(contact_origins -> origins (origin_id));
diesel::joinable!(contact_tags -> contacts (contact_id));
diesel::joinable!(contact_tags -> tags (tag_id));
diesel::joinable!(origin_members -> origins (origin_id));

diesel::allow_tables_to_appear_in_same_query!(
    accounts,
    origins,
    pipeline_stages,
    contacts,
    origin_members,
    contact_origins,
    tags,
    contact_tags,
);
