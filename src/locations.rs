//! Location lifecycle. Locations are the top of the hierarchy; accounts hang
//! off a location and members hang off an account.

use chrono::Utc;
use uuid::Uuid;

use crate::db::{DbLocation, MemberDb};
use crate::error::{Entity, ServiceError};
use crate::types::{CancelToken, NewLocation};

/// Create a location.
pub fn create_location(
    db: &MemberDb,
    req: &NewLocation,
    cancel: &CancelToken,
) -> Result<DbLocation, ServiceError> {
    if cancel.is_cancelled() {
        return Err(ServiceError::Cancelled);
    }
    if req.name.trim().is_empty() {
        return Err(ServiceError::InvalidArgument(
            "location name is required".to_string(),
        ));
    }

    db.with_transaction(|db| {
        let mut location = DbLocation {
            uid: 0,
            guid: Uuid::new_v4().to_string(),
            name: req.name.clone(),
            disabled: false,
            address: req.address.clone(),
            city: req.city.clone(),
            locale: req.locale.clone(),
            postal_code: req.postal_code.clone(),
            created_utc: Utc::now().to_rfc3339(),
            updated_utc: None,
        };
        location.uid = db.insert_location(&location)?;

        if cancel.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }

        log::info!("Created location {} ({})", location.guid, location.name);
        Ok(location)
    })
}

/// Fetch a location by guid.
pub fn get_location(db: &MemberDb, location_guid: &str) -> Result<DbLocation, ServiceError> {
    db.get_location(location_guid)?
        .ok_or(ServiceError::NotFound(Entity::Location))
}

/// List every location that has not been disabled.
pub fn list_locations(db: &MemberDb) -> Result<Vec<DbLocation>, ServiceError> {
    Ok(db.get_enabled_locations()?)
}
