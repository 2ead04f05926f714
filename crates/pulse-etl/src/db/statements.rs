//! Compiled SQL statements
//!
//! Every statement the pipeline issues lives here as a `const`, keyed by
//! name, so the full SQL surface is reviewable in one place and checked by
//! the schema tests rather than assembled at call sites.

// ============================================================================
// Schema DDL
// ============================================================================

pub const CREATE_COUNTRY_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS country (
        id INTEGER PRIMARY KEY,
        code TEXT NOT NULL,
        name TEXT NOT NULL
    )
";

pub const CREATE_IMPORT_LOG_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS import_log (
        id INTEGER PRIMARY KEY,
        batch_date TEXT,
        country_id INTEGER,
        import_directory_name TEXT,
        import_file_name TEXT,
        file_created_date TEXT,
        file_last_modified_date TEXT,
        row_count INTEGER,
        FOREIGN KEY (country_id) REFERENCES country(id)
    )
";

pub const CREATE_API_IMPORT_LOG_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS api_import_log (
        id INTEGER PRIMARY KEY,
        country_id INTEGER,
        api_id TEXT,
        start_time TEXT,
        end_time TEXT,
        code_response INTEGER,
        error_messages TEXT,
        FOREIGN KEY (country_id) REFERENCES country(id)
    )
";

pub const CREATE_TRANSFORM_LOG_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS transform_log (
        id TEXT PRIMARY KEY,
        batch_date TEXT,
        country_id TEXT,
        processed_directory_name TEXT,
        processed_file_name TEXT,
        row_count INTEGER,
        status TEXT
    )
";

pub const CREATE_WEATHER_DATA_IMPORT_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS weather_data_import (
        id TEXT PRIMARY KEY,
        country_id TEXT,
        date TEXT,
        tavg REAL,
        tmin REAL,
        tmax REAL,
        prcp REAL,
        snow REAL,
        wdir REAL,
        wspd REAL,
        wpgt REAL,
        pres REAL,
        tsun REAL
    )
";

pub const CREATE_COVID_19_DATA_IMPORT_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS covid_19_data_import (
        id TEXT PRIMARY KEY,
        country_id TEXT,
        date TEXT,
        cases INTEGER,
        deaths INTEGER,
        recovered INTEGER
    )
";

pub const CREATE_ETL_ERRORS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS etl_errors (
        id TEXT PRIMARY KEY,
        error_code INTEGER,
        error_type TEXT,
        message TEXT,
        timestamp TEXT,
        severity TEXT,
        component TEXT,
        source_file TEXT,
        record_id TEXT,
        details TEXT
    )
";

/// DDL for all permanent tables, executed in order at startup
pub const SCHEMA_TABLES: &[&str] = &[
    CREATE_COUNTRY_TABLE,
    CREATE_IMPORT_LOG_TABLE,
    CREATE_API_IMPORT_LOG_TABLE,
    CREATE_TRANSFORM_LOG_TABLE,
    CREATE_WEATHER_DATA_IMPORT_TABLE,
    CREATE_COVID_19_DATA_IMPORT_TABLE,
    CREATE_ETL_ERRORS_TABLE,
];

// ============================================================================
// Staging tables
//
// Named like SQLite temp tables but created as ordinary tables: their
// lifetime must span the batch, not any single pooled connection. The date
// and country columns stay string-typed, the fact insert resolves them.
// ============================================================================

pub const CREATE_TEMP_WEATHER_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS temp_weather_data (
        id TEXT,
        country_id TEXT,
        date TEXT,
        tavg REAL,
        tmin REAL,
        tmax REAL,
        prcp REAL,
        snow REAL,
        wdir REAL,
        wspd REAL,
        wpgt REAL,
        pres REAL,
        tsun REAL
    )
";

pub const CREATE_TEMP_COVID_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS temp_covid_data (
        id TEXT,
        country_id TEXT,
        date TEXT,
        cases INTEGER,
        deaths INTEGER,
        recovered INTEGER
    )
";

pub const DROP_TEMP_WEATHER_TABLE: &str = "DROP TABLE IF EXISTS temp_weather_data";

pub const DROP_TEMP_COVID_TABLE: &str = "DROP TABLE IF EXISTS temp_covid_data";

// ============================================================================
// Inserts
// ============================================================================

pub const INSERT_COUNTRY: &str = "
    INSERT INTO country (id, code, name)
    VALUES (?, ?, ?)
    ON CONFLICT (id) DO NOTHING
";

pub const INSERT_API_LOG: &str = "
    INSERT INTO api_import_log
    (id, country_id, api_id, start_time, end_time, code_response, error_messages)
    VALUES (?, ?, ?, ?, ?, ?, ?)
";

pub const INSERT_IMPORT_LOG: &str = "
    INSERT INTO import_log
    (id, batch_date, country_id, import_directory_name, import_file_name,
    file_created_date, file_last_modified_date, row_count)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
";

pub const INSERT_TRANSFORM_LOG: &str = "
    INSERT INTO transform_log
    (id, batch_date, country_id, processed_directory_name, processed_file_name,
    row_count, status)
    VALUES (?, ?, ?, ?, ?, ?, ?)
";

pub const INSERT_WEATHER_DATA: &str = "
    INSERT INTO weather_data_import
    (id, country_id, date, tavg, tmin, tmax, prcp, snow, wdir, wspd, wpgt, pres, tsun)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";

pub const INSERT_COVID_DATA: &str = "
    INSERT INTO covid_19_data_import
    (id, country_id, date, cases, deaths, recovered)
    VALUES (?, ?, ?, ?, ?, ?)
";

pub const INSERT_TEMP_WEATHER_DATA: &str = "
    INSERT INTO temp_weather_data
    (id, country_id, date, tavg, tmin, tmax, prcp, snow, wdir, wspd, wpgt, pres, tsun)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";

pub const INSERT_TEMP_COVID_DATA: &str = "
    INSERT INTO temp_covid_data
    (id, country_id, date, cases, deaths, recovered)
    VALUES (?, ?, ?, ?, ?, ?)
";

pub const INSERT_ETL_ERROR: &str = "
    INSERT INTO etl_errors
    (id, error_code, error_type, message, timestamp, severity, component,
    source_file, record_id, details)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";

// ============================================================================
// Queries
// ============================================================================

pub const GET_COUNTRY_BY_NAME: &str = "SELECT id FROM country WHERE name = ?";

pub const GET_MAX_API_LOG_ID: &str = "SELECT COALESCE(MAX(id), 0) FROM api_import_log";

pub const GET_MAX_IMPORT_LOG_ID: &str = "SELECT COALESCE(MAX(id), 0) FROM import_log";

pub const GET_LATEST_WEATHER_DATA: &str = "
    SELECT id, country_id, date, tavg, tmin, tmax, prcp, snow, wdir, wspd, wpgt, pres, tsun
    FROM weather_data_import
    WHERE country_id = ?
    ORDER BY date DESC
    LIMIT ?
";

pub const GET_COVID_DATA_BY_DATE_RANGE: &str = "
    SELECT id, country_id, date, cases, deaths, recovered
    FROM covid_19_data_import
    WHERE country_id = ?
    AND date BETWEEN ? AND ?
    ORDER BY date
";
