//! Historical bar source port trait.

use crate::domain::error::SpytraderError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars in ascending date order, restricted to the optional inclusive range.
    ///
    /// An empty result is reported as [`SpytraderError::NoData`].
    fn fetch_ohlcv(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, SpytraderError>;

    /// First date, last date and bar count of the whole source.
    fn data_range(&self) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SpytraderError>;
}
