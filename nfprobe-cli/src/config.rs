//! Startup configuration parsing.
//!
//! Everything here is fatal on malformed input: the process must refuse to
//! start rather than run a long collection with a half-understood setup.

use anyhow::{Context, Result, bail};
use collector::Entity;

/// Parse a duration string into seconds.
///
/// Accepts bare seconds ("3600", "2.5") and unit-suffixed compositions
/// ("1h", "30m", "1h30m", "90s"); a trailing bare number counts as seconds.
pub fn parse_duration(input: &str) -> Result<f64> {
    let input = input.trim().to_lowercase();
    if input.is_empty() {
        bail!("empty duration string");
    }

    // Pure numeric input is seconds.
    if let Ok(seconds) = input.parse::<f64>() {
        if !seconds.is_finite() || seconds < 0.0 {
            bail!("duration '{input}' must be a finite non-negative number of seconds");
        }
        return Ok(seconds);
    }

    let mut total = 0.0;
    let mut number = String::new();
    for (pos, ch) in input.chars().enumerate() {
        match ch {
            '0'..='9' | '.' => number.push(ch),
            'h' | 'm' | 's' => {
                if number.is_empty() {
                    bail!("unit '{ch}' at position {pos} in '{input}' has no preceding number");
                }
                let value: f64 = number
                    .parse()
                    .with_context(|| format!("invalid number '{number}' in '{input}'"))?;
                total += match ch {
                    'h' => value * 3600.0,
                    'm' => value * 60.0,
                    _ => value,
                };
                number.clear();
            }
            _ => bail!(
                "invalid character '{ch}' at position {pos} in duration '{input}' \
                 (expected digits, '.', 'h', 'm' or 's')"
            ),
        }
    }
    if !number.is_empty() {
        total += number
            .parse::<f64>()
            .with_context(|| format!("invalid trailing number '{number}' in '{input}'"))?;
    }

    if !total.is_finite() {
        bail!("duration '{input}' overflows");
    }
    Ok(total)
}

/// Parse the entity list: comma-separated `name:container:stream_addr`.
///
/// The stream address keeps any further colons (host:port), and gets a
/// `ws://` scheme when none is present.
pub fn parse_entities(input: &str) -> Result<Vec<Entity>> {
    let mut entities = Vec::new();
    for spec in input.split(',') {
        let spec = spec.trim();
        if spec.is_empty() {
            continue;
        }
        let mut parts = spec.splitn(3, ':');
        let (Some(name), Some(container), Some(addr)) =
            (parts.next(), parts.next(), parts.next())
        else {
            bail!("malformed entity spec '{spec}' (expected name:container:stream_addr)");
        };
        if name.is_empty() || container.is_empty() || addr.is_empty() {
            bail!("malformed entity spec '{spec}' (empty field)");
        }

        let stream_url = if addr.contains("://") {
            addr.to_string()
        } else {
            format!("ws://{addr}")
        };

        entities.push(Entity {
            name: name.to_string(),
            container: container.to_string(),
            stream_url,
        });
    }

    if entities.is_empty() {
        bail!("entity list is empty");
    }
    Ok(entities)
}
