/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Diesel table definitions for the backup catalog.
//!
//! The authoritative DDL lives in `sql/pgbackman_{n}.sql`; these definitions
//! mirror the schema at [`crate::version::CATALOG_VERSION`].

diesel::table! {
    backup_servers (server_id) {
        server_id -> Int4,
        hostname -> Text,
        domain_name -> Text,
        status -> Text,
        remarks -> Text,
        registered -> Timestamptz,
    }
}

diesel::table! {
    backup_server_config (server_id, parameter) {
        server_id -> Int4,
        parameter -> Text,
        value -> Text,
        description -> Text,
    }
}

diesel::table! {
    pgsql_nodes (node_id) {
        node_id -> Int4,
        hostname -> Text,
        domain_name -> Text,
        pgport -> Int4,
        admin_user -> Text,
        status -> Text,
        remarks -> Text,
        registered -> Timestamptz,
    }
}

diesel::table! {
    pgsql_node_config (node_id, parameter) {
        node_id -> Int4,
        parameter -> Text,
        value -> Text,
        description -> Text,
    }
}

diesel::table! {
    backup_definitions (def_id) {
        def_id -> Int8,
        backup_server_id -> Int4,
        pgsql_node_id -> Int4,
        dbname -> Text,
        minutes_cron -> Text,
        hours_cron -> Text,
        day_month_cron -> Text,
        month_cron -> Text,
        weekday_cron -> Text,
        backup_code -> Text,
        encryption -> Bool,
        retention_period -> Text,
        retention_redundancy -> Int4,
        extra_parameters -> Text,
        job_status -> Text,
        remarks -> Text,
        registered -> Timestamptz,
        updated -> Timestamptz,
    }
}

diesel::table! {
    snapshot_definitions (snapshot_id) {
        snapshot_id -> Int8,
        backup_server_id -> Int4,
        pgsql_node_id -> Int4,
        dbname -> Text,
        at_time -> Timestamptz,
        backup_code -> Text,
        encryption -> Bool,
        retention_period -> Text,
        extra_parameters -> Text,
        tag -> Text,
        pg_dump_release -> Nullable<Text>,
        status -> Text,
        error_message -> Nullable<Text>,
        registered -> Timestamptz,
    }
}

diesel::table! {
    restore_definitions (restore_id) {
        restore_id -> Int8,
        at_time -> Timestamptz,
        bck_id -> Int8,
        backup_server_id -> Int4,
        target_pgsql_node_id -> Int4,
        target_dbname -> Text,
        renamed_dbname -> Nullable<Text>,
        extra_parameters -> Text,
        roles_to_restore -> Array<Text>,
        status -> Text,
        error_message -> Nullable<Text>,
        registered -> Timestamptz,
    }
}

diesel::table! {
    backup_catalog (bck_id) {
        bck_id -> Int8,
        def_id -> Nullable<Int8>,
        snapshot_id -> Nullable<Int8>,
        procpid -> Int4,
        backup_server_id -> Int4,
        pgsql_node_id -> Int4,
        dbname -> Text,
        started -> Timestamptz,
        finished -> Timestamptz,
        duration -> Text,
        pg_dump_file -> Text,
        pg_dump_file_size -> Int8,
        pg_dump_log_file -> Text,
        globals_file -> Text,
        globals_file_size -> Int8,
        globals_log_file -> Text,
        indexes_file -> Text,
        indexes_file_size -> Int8,
        indexes_log_file -> Text,
        execution_status -> Text,
        execution_return_code -> Int4,
        error_message -> Text,
        pg_dump_release -> Nullable<Text>,
        role_list -> Array<Text>,
        extra_info -> Text,
        deleted -> Bool,
        alerted_at -> Nullable<Timestamptz>,
        registered -> Timestamptz,
    }
}

diesel::table! {
    restore_catalog (rst_id) {
        rst_id -> Int8,
        restore_id -> Int8,
        procpid -> Int4,
        backup_server_id -> Int4,
        target_pgsql_node_id -> Int4,
        bck_id -> Int8,
        target_dbname -> Text,
        renamed_dbname -> Nullable<Text>,
        started -> Timestamptz,
        finished -> Timestamptz,
        duration -> Text,
        restore_log_file -> Text,
        execution_status -> Text,
        execution_return_code -> Int4,
        error_message -> Text,
        pg_restore_release -> Nullable<Text>,
        role_list -> Array<Text>,
        alerted_at -> Nullable<Timestamptz>,
        registered -> Timestamptz,
    }
}

diesel::table! {
    job_queue (job_id) {
        job_id -> Int8,
        backup_server_id -> Int4,
        pgsql_node_id -> Nullable<Int4>,
        kind -> Text,
        payload -> Jsonb,
        registered -> Timestamptz,
    }
}

diesel::table! {
    backup_server_pg_bin_dirs (backup_server_id, pg_version) {
        backup_server_id -> Int4,
        pg_version -> Text,
        bin_dir -> Text,
        description -> Text,
    }
}

diesel::table! {
    backup_server_default_pg_bin_dirs (pg_version) {
        pg_version -> Text,
        bin_dir -> Text,
        description -> Text,
    }
}

diesel::table! {
    catalog_info (database_version) {
        database_version -> Int4,
        registered -> Timestamptz,
    }
}

diesel::joinable!(backup_definitions -> backup_servers (backup_server_id));
diesel::joinable!(backup_definitions -> pgsql_nodes (pgsql_node_id));
diesel::joinable!(snapshot_definitions -> backup_servers (backup_server_id));
diesel::joinable!(snapshot_definitions -> pgsql_nodes (pgsql_node_id));
diesel::joinable!(backup_catalog -> backup_servers (backup_server_id));
diesel::joinable!(backup_catalog -> pgsql_nodes (pgsql_node_id));
diesel::joinable!(job_queue -> backup_servers (backup_server_id));

diesel::allow_tables_to_appear_in_same_query!(
    backup_servers,
    backup_server_config,
    pgsql_nodes,
    pgsql_node_config,
    backup_definitions,
    snapshot_definitions,
    restore_definitions,
    backup_catalog,
    restore_catalog,
    job_queue,
    backup_server_pg_bin_dirs,
    backup_server_default_pg_bin_dirs,
    catalog_info,
);
