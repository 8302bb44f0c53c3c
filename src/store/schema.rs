//! DDL for the two tables, per backend.
//!
//! Production schemas are managed outside this crate; these statements back
//! the `init-schema` command and the in-memory stores used in tests.

pub const POSTGRES: &str = r#"
CREATE TABLE IF NOT EXISTS station (
    stationcode TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    nom_arrondissement_communes TEXT NOT NULL,
    capacity INTEGER NOT NULL,
    coordonnee_x DOUBLE PRECISION NOT NULL,
    coordonnee_y DOUBLE PRECISION NOT NULL
);
CREATE TABLE IF NOT EXISTS historic (
    record_id TEXT PRIMARY KEY,
    stationcode TEXT NOT NULL,
    ebike INTEGER NOT NULL,
    mechanical INTEGER NOT NULL,
    numbikesavailable INTEGER NOT NULL,
    numdocksavailable INTEGER NOT NULL,
    is_renting BOOLEAN NOT NULL,
    is_installed BOOLEAN NOT NULL,
    is_returning BOOLEAN NOT NULL,
    duedate TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_historic_stationcode ON historic(stationcode);
"#;

pub const SQLITE: &str = r#"
CREATE TABLE IF NOT EXISTS station (
    stationcode TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    nom_arrondissement_communes TEXT NOT NULL,
    capacity INTEGER NOT NULL,
    coordonnee_x REAL NOT NULL,
    coordonnee_y REAL NOT NULL
);
CREATE TABLE IF NOT EXISTS historic (
    record_id TEXT PRIMARY KEY,
    stationcode TEXT NOT NULL,
    ebike INTEGER NOT NULL,
    mechanical INTEGER NOT NULL,
    numbikesavailable INTEGER NOT NULL,
    numdocksavailable INTEGER NOT NULL,
    is_renting BOOLEAN NOT NULL,
    is_installed BOOLEAN NOT NULL,
    is_returning BOOLEAN NOT NULL,
    duedate TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_historic_stationcode ON historic(stationcode);
"#;
