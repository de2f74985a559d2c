//! Fixed text around the data: session preamble, per-table headers, epilogue.

const PREAMBLE: &str = r#"
--
-- PostgreSQL database dump
--

\connect {dbname}
\set AUTOCOMMIT off

BEGIN;

SET statement_timeout = 0;
SET lock_timeout = 0;
SET client_encoding = 'UTF8';
SET standard_conforming_strings = on;
SET check_function_bodies = false;
SET client_min_messages = warning;

SET search_path = public, pg_catalog;

"#;

pub const EPILOGUE: &str = r#"
COMMIT;

--
-- PostgreSQL database dump complete
--
"#;

pub fn preamble(dbname: &str) -> String {
    PREAMBLE.replace("{dbname}", dbname)
}

/// Comment block written before each table's data.
pub fn data_header(table: &str) -> String {
    format!("\n--\n-- Data for Name: {}; Type: TABLE DATA\n--\n\n", table)
}
