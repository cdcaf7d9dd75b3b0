use crate::catalog::PatientRecord;
use crate::scrub::{ScrubConfig, Scrubber};
use crate::signal::HeartRateSeries;
use crate::zones::ZoneBoundaries;
use log::debug;

/// Identifies one in-flight case load. Tokens are monotonic; only the most
/// recently issued one may install its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadToken(u64);

/// Owns at most one loaded case at a time.
///
/// Selecting a new case replaces the record, series, and scrub state
/// wholesale. Loads are guarded by tokens so a slow fetch finishing after a
/// newer selection is discarded instead of clobbering it (last writer wins).
#[derive(Debug, Default)]
pub struct CaseSession {
    config: ScrubConfig,
    next_token: u64,
    current_token: Option<u64>,
    loaded: Option<LoadedCase>,
}

#[derive(Debug)]
pub struct LoadedCase {
    pub record: PatientRecord,
    pub scrubber: Scrubber,
}

impl CaseSession {
    pub fn new(config: ScrubConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Start loading a case. Any token issued earlier becomes stale.
    pub fn begin_load(&mut self) -> LoadToken {
        self.next_token += 1;
        self.current_token = Some(self.next_token);
        LoadToken(self.next_token)
    }

    /// Install a finished load if its token is still current. Returns
    /// whether the result was installed; stale results are dropped.
    pub fn complete_load(
        &mut self,
        token: LoadToken,
        record: PatientRecord,
        series: HeartRateSeries,
    ) -> bool {
        if self.current_token != Some(token.0) {
            debug!(
                "discarding stale load for case {} (token {})",
                record.case_id, token.0
            );
            return false;
        }
        let zones = ZoneBoundaries::for_age(record.age);
        self.loaded = Some(LoadedCase {
            record,
            scrubber: Scrubber::new(series, zones, self.config),
        });
        true
    }

    /// Drop the loaded case and invalidate outstanding loads.
    pub fn clear(&mut self) {
        self.current_token = None;
        self.loaded = None;
    }

    pub fn case(&self) -> Option<&LoadedCase> {
        self.loaded.as_ref()
    }

    pub fn case_mut(&mut self) -> Option<&mut LoadedCase> {
        self.loaded.as_mut()
    }
}
