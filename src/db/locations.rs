use rusqlite::{params, Row};

use super::{DbError, DbLocation, MemberDb};

impl MemberDb {
    // =========================================================================
    // Locations
    // =========================================================================

    /// Insert a location row. Returns the assigned internal uid.
    pub fn insert_location(&self, location: &DbLocation) -> Result<i64, DbError> {
        self.conn.execute(
            "INSERT INTO location (
                guid, name, disabled, address, city, locale, postal_code,
                created_utc, updated_utc
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                location.guid,
                location.name,
                location.disabled as i32,
                location.address,
                location.city,
                location.locale,
                location.postal_code,
                location.created_utc,
                location.updated_utc,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Look up a location by its public guid.
    pub fn get_location(&self, guid: &str) -> Result<Option<DbLocation>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, guid, name, disabled, address, city, locale, postal_code,
                    created_utc, updated_utc
             FROM location WHERE guid = ?1",
        )?;
        let mut rows = stmt.query_map(params![guid], Self::map_location_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// List all locations that have not been disabled.
    pub fn get_enabled_locations(&self) -> Result<Vec<DbLocation>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, guid, name, disabled, address, city, locale, postal_code,
                    created_utc, updated_utc
             FROM location WHERE disabled = 0 ORDER BY name",
        )?;
        let rows = stmt.query_map([], Self::map_location_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn map_location_row(row: &Row) -> rusqlite::Result<DbLocation> {
        Ok(DbLocation {
            uid: row.get(0)?,
            guid: row.get(1)?,
            name: row.get(2)?,
            disabled: row.get::<_, i64>(3)? != 0,
            address: row.get(4)?,
            city: row.get(5)?,
            locale: row.get(6)?,
            postal_code: row.get(7)?,
            created_utc: row.get(8)?,
            updated_utc: row.get(9)?,
        })
    }
}
