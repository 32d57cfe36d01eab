use super::Prober;
use super::helpers::{connect_url, map_curl_error};
use crate::config::Target;
use crate::probe::{ProbeError, ProbeResult, ProbeSample};
use chrono::Utc;
use curl::Error as CurlError;
use curl::easy::Easy;
use std::time::{Duration, Instant};

/// First attempt plus one retry.
const MAX_ATTEMPTS: u8 = 2;

/// TCP connect-only reachability probe backed by libcurl.
pub struct ProbeClient {
    easy: Easy,
    connect_timeout: Duration,
}

impl ProbeClient {
    pub fn new(connect_timeout: Duration) -> Result<Self, CurlError> {
        let mut easy = Easy::new();
        easy.connect_only(true)?;
        easy.signal(false)?;
        Ok(Self {
            easy,
            connect_timeout,
        })
    }

    fn probe_once(&mut self, target: &Target) -> Result<(), ProbeError> {
        self.easy.reset();
        self.configure(target).map_err(|err| map_curl_error(&err))?;
        self.easy.perform().map_err(|err| map_curl_error(&err))
    }

    fn configure(&mut self, target: &Target) -> Result<(), CurlError> {
        self.easy.connect_only(true)?;
        self.easy.signal(false)?;
        self.easy.fresh_connect(true)?;
        self.easy.forbid_reuse(true)?;
        self.easy.connect_timeout(self.connect_timeout)?;
        self.easy.timeout(self.connect_timeout)?;
        self.easy.url(&connect_url(target))
    }
}

impl Prober for ProbeClient {
    fn probe(&mut self, target: &Target) -> ProbeSample {
        let ts = Utc::now();
        let started = Instant::now();
        let mut attempts = 0;
        let mut result = ProbeResult::Ok;

        while attempts < MAX_ATTEMPTS {
            attempts += 1;
            match self.probe_once(target) {
                Ok(()) => {
                    result = ProbeResult::Ok;
                    break;
                }
                Err(err) => result = ProbeResult::Err(err),
            }
        }

        ProbeSample {
            ts,
            target: target.clone(),
            result,
            elapsed: started.elapsed(),
            attempts,
        }
    }
}
