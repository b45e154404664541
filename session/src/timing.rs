//! Timing-based output collection
//!
//! Reads whatever the device sends in poll-sized slices and stops after a
//! quiet window instead of matching a prompt pattern. Devices with odd or
//! missing prompts still produce complete output this way.

use crate::{CommandError, TimingPolicy};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{timeout, Instant};

/// Collect output from `reader` until the policy's quiet window elapses.
///
/// Exhausting `max_polls` returns whatever was read so far; the deadline,
/// when set, is a hard error. EOF before any byte arrives means the peer
/// hung up mid-exchange and is reported as [`CommandError::SessionClosed`].
pub async fn read_until_quiet<R>(
    reader: &mut R,
    policy: &TimingPolicy,
    command: &str,
) -> Result<String, CommandError>
where
    R: AsyncRead + Unpin + Send,
{
    let started = Instant::now();
    let mut collected: Vec<u8> = Vec::new();
    let mut buf = [0u8; 4096];
    let mut quiet = 0u32;

    for _ in 0..policy.max_polls {
        if let Some(deadline) = policy.deadline {
            if started.elapsed() > deadline {
                return Err(CommandError::DeadlineExceeded {
                    command: command.to_string(),
                    deadline,
                });
            }
        }

        match timeout(policy.poll_interval, reader.read(&mut buf)).await {
            Ok(Ok(0)) => {
                if collected.is_empty() {
                    return Err(CommandError::SessionClosed {
                        command: command.to_string(),
                    });
                }
                break;
            }
            Ok(Ok(n)) => {
                collected.extend_from_slice(&buf[..n]);
                quiet = 0;
            }
            Ok(Err(e)) => {
                return Err(CommandError::Io {
                    command: command.to_string(),
                    source: e,
                });
            }
            Err(_) => {
                quiet += 1;
                if quiet >= policy.quiet_polls {
                    break;
                }
            }
        }
    }

    Ok(String::from_utf8_lossy(&collected).into_owned())
}
