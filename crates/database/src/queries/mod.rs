use tracking::StoreError;

pub mod lease;
pub mod occupancy;
pub mod station;
pub mod street;

pub(crate) fn convert_error(why: sqlx::Error) -> StoreError {
    match why {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        _ => StoreError::Unavailable(Box::new(why)),
    }
}
