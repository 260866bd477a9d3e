use console::{StyledObject, style};
use env_logger::{Builder, Env};
use log::Level;
use std::io::Write;

/// Default filter; actix logs every accepted connection at info
const DEFAULT_FILTER: &str = "info,actix_server=warn";
const VERBOSE_FILTER: &str = "debug,actix_server=info";

/// Initialize logger; `RUST_LOG` overrides the default filter.
///
/// Verbose output also names the module each record comes from.
pub fn init_logger(verbose: bool) {
    let filter = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let env = Env::default().default_filter_or(filter);

    Builder::from_env(env)
        .format(move |buf, record| {
            let level = level_label(record.level());
            if verbose {
                writeln!(
                    buf,
                    "{} {} {}",
                    level,
                    style(record.target()).dim(),
                    record.args()
                )
            } else {
                writeln!(buf, "{} {}", level, record.args())
            }
        })
        .init();
}

/// Fixed-width level label, colored per level
fn level_label(level: Level) -> StyledObject<&'static str> {
    match level {
        Level::Error => style("ERROR").red().bold(),
        Level::Warn => style("WARN ").yellow().bold(),
        Level::Info => style("INFO ").green(),
        Level::Debug => style("DEBUG").cyan(),
        Level::Trace => style("TRACE").dim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_labels_share_one_width() {
        for level in Level::iter() {
            let label = level_label(level).force_styling(false).to_string();
            assert_eq!(label.len(), 5);
            assert!(label.trim_end().eq_ignore_ascii_case(level.as_str()));
        }
    }
}
