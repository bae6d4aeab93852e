//! Reference tick source
//!
//! While a domain is usable, every interval reports the elapsed time with
//! `track_time`. Once blocked, ticks stop and the loop polls `get_status`
//! until the cooldown is over; the daemon never pushes the release.

use anyhow::Result;
use clocklock_api::{Command, GetStatusRequest, ResponsePayload, TrackTimeRequest};
use clocklock_ipc::IpcClient;
use clocklock_util::{Domain, format_duration};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Block state change seen by the poller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Blocked { cooldown_remaining_ms: Option<u64> },
    Released,
    Failed(String),
}

/// Client-side view of one domain's block state
#[derive(Debug)]
pub struct Poller {
    domain: Domain,
    blocked: bool,
}

impl Poller {
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            blocked: false,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Command for the next tick, given the time since the previous one
    pub fn next_command(&self, elapsed: Duration) -> Command {
        if self.blocked {
            Command::GetStatus(GetStatusRequest {
                domain: self.domain.clone(),
            })
        } else {
            Command::TrackTime(TrackTimeRequest {
                domain: self.domain.clone(),
                delta_ms: i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
            })
        }
    }

    /// Fold a response into the local state
    pub fn observe(&mut self, payload: &ResponsePayload) -> Option<Transition> {
        match payload {
            ResponsePayload::TrackTime(resp) => {
                if let Some(error) = &resp.error {
                    return Some(Transition::Failed(error.clone()));
                }
                self.apply(resp.blocked, resp.cooldown_remaining_ms)
            }
            ResponsePayload::Status(status) => {
                self.apply(status.blocked, status.cooldown_remaining_ms)
            }
            _ => None,
        }
    }

    fn apply(&mut self, blocked: bool, cooldown_remaining_ms: Option<u64>) -> Option<Transition> {
        let transition = match (self.blocked, blocked) {
            (false, true) => Some(Transition::Blocked {
                cooldown_remaining_ms,
            }),
            (true, false) => Some(Transition::Released),
            _ => None,
        };
        self.blocked = blocked;
        transition
    }
}

/// Drive the tick loop until Ctrl-C
pub async fn run(client: &mut IpcClient, domain: Domain, interval: Duration) -> Result<()> {
    let mut poller = Poller::new(domain.clone());
    let mut timer = tokio::time::interval(interval);
    // The first tick completes immediately
    timer.tick().await;
    let mut last = Instant::now();

    println!("Tracking {} every {}", domain, format_duration(interval));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("Stopped");
                return Ok(());
            }
            _ = timer.tick() => {
                let now = Instant::now();
                let command = poller.next_command(now - last);
                last = now;

                let payload = match client.call(command).await {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(error = %e, "Tick failed");
                        continue;
                    }
                };
                debug!(?payload, "Tick response");

                match poller.observe(&payload) {
                    Some(Transition::Blocked { cooldown_remaining_ms }) => {
                        let remaining = cooldown_remaining_ms
                            .map(|ms| format_duration(Duration::from_millis(ms)))
                            .unwrap_or_else(|| "unknown".into());
                        println!("{} blocked, cooldown {}", domain, remaining);
                    }
                    Some(Transition::Released) => println!("{} released", domain),
                    Some(Transition::Failed(error)) => eprintln!("{}: {}", domain, error),
                    None => {}
                }
            }
        }
    }
}
