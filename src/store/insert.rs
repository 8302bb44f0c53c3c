//! Conflict-ignoring multi-row inserts shared by both backends.
//!
//! Placeholders come from the backend's `QueryBuilder`, so the same builder
//! yields `$n` for PostgreSQL and `?` for SQLite.

use chrono::{DateTime, Utc};
use sqlx::{Database, Encode, QueryBuilder, Type};

use crate::model::{Observation, Station, Table};

/// Rows per statement. Keeps the bind count (rows × columns) under the
/// parameter limit of both backends.
pub(crate) const BATCH_ROWS: usize = 1_000;

/// `INSERT INTO station ... VALUES (...), (...) ON CONFLICT (stationcode) DO NOTHING`
pub(crate) fn stations<'a, DB>(rows: &'a [Station]) -> QueryBuilder<'a, DB>
where
    DB: Database,
    &'a str: Encode<'a, DB> + Type<DB>,
    i32: Encode<'a, DB> + Type<DB>,
    f64: Encode<'a, DB> + Type<DB>,
{
    let mut qb = QueryBuilder::new(
        "INSERT INTO station (stationcode, name, nom_arrondissement_communes, capacity, coordonnee_x, coordonnee_y) ",
    );
    qb.push_values(rows, |mut b, s| {
        b.push_bind(s.stationcode.as_str())
            .push_bind(s.name.as_str())
            .push_bind(s.district.as_str())
            .push_bind(s.capacity)
            .push_bind(s.x)
            .push_bind(s.y);
    });
    on_conflict_do_nothing(&mut qb, Table::Station);
    qb
}

/// `INSERT INTO historic ... VALUES (...), (...) ON CONFLICT (record_id) DO NOTHING`
pub(crate) fn observations<'a, DB>(rows: &'a [Observation]) -> QueryBuilder<'a, DB>
where
    DB: Database,
    &'a str: Encode<'a, DB> + Type<DB>,
    i32: Encode<'a, DB> + Type<DB>,
    bool: Encode<'a, DB> + Type<DB>,
    DateTime<Utc>: Encode<'a, DB> + Type<DB>,
{
    let mut qb = QueryBuilder::new(
        "INSERT INTO historic (record_id, stationcode, ebike, mechanical, numbikesavailable, numdocksavailable, \
         is_renting, is_installed, is_returning, duedate) ",
    );
    qb.push_values(rows, |mut b, o| {
        b.push_bind(o.record_id.as_str())
            .push_bind(o.stationcode.as_str())
            .push_bind(o.ebike_count)
            .push_bind(o.mechanical_count)
            .push_bind(o.bikes_available)
            .push_bind(o.docks_available)
            .push_bind(o.renting_open)
            .push_bind(o.installed)
            .push_bind(o.returning_open)
            .push_bind(o.due_at);
    });
    on_conflict_do_nothing(&mut qb, Table::Historic);
    qb
}

fn on_conflict_do_nothing<DB: Database>(qb: &mut QueryBuilder<'_, DB>, table: Table) {
    qb.push(" ON CONFLICT (")
        .push(table.primary_key())
        .push(") DO NOTHING");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sqlx::{Postgres, Sqlite};

    fn station(code: &str) -> Station {
        Station {
            stationcode: code.to_string(),
            name: "Benjamin Godard - Victor Hugo".to_string(),
            district: "Paris".to_string(),
            capacity: 35,
            x: 48.865983,
            y: 2.275725,
        }
    }

    fn observation(id: &str) -> Observation {
        Observation {
            record_id: id.to_string(),
            stationcode: "16107".to_string(),
            ebike_count: 1,
            mechanical_count: 2,
            bikes_available: 3,
            docks_available: 32,
            renting_open: true,
            installed: true,
            returning_open: false,
            due_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_stations_sql_postgres() {
        let rows = [station("16107"), station("2001")];
        let qb = stations::<Postgres>(&rows);
        let sql = qb.sql();

        assert!(sql.contains("VALUES ($1, $2, $3, $4, $5, $6), ($7, $8, $9, $10, $11, $12)"));
        assert!(sql.ends_with(" ON CONFLICT (stationcode) DO NOTHING"));
    }

    #[test]
    fn test_observations_sql_sqlite() {
        let rows = [observation("A")];
        let qb = observations::<Sqlite>(&rows);
        let sql = qb.sql();

        assert!(sql.contains("VALUES (?"));
        assert_eq!(sql.matches('?').count(), 10);
        assert!(sql.ends_with(" ON CONFLICT (record_id) DO NOTHING"));
    }

    #[test]
    fn test_batch_stays_under_bind_limits() {
        // historic has the widest rows; SQLite allows 32766 binds, PostgreSQL 65535
        assert!(BATCH_ROWS * 10 <= 32_766);
    }
}
