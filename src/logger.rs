//! Log output annotated with simulation context.
//!
//! Workers record the simulated time and the host they currently execute
//! in a thread-local scope. [`SimFormat`] prefixes every log line with
//! that scope, so output of concurrent hosts stays attributable.

use crate::time::SimTime;
use nu_ansi_term::{Color, Style};
use std::{cell::RefCell, fmt::Write, sync::Arc};
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    filter::Directive,
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields, FormattedFields},
    registry::LookupSpan,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

/// The log level that will be used if `RUST_LOG` is not defined.
pub const FALLBACK_LOG_LEVEL: Level = Level::INFO;

thread_local! {
    static SCOPE: RefCell<Scope> = const { RefCell::new(Scope { time: None, host: None }) };
}

#[derive(Debug, Clone)]
struct Scope {
    time: Option<SimTime>,
    host: Option<Arc<str>>,
}

/// Records the simulated time of the calling thread.
pub(crate) fn set_time(time: SimTime) {
    SCOPE.with(|scope| scope.borrow_mut().time = Some(time));
}

///
/// Marks the calling thread as executing `host` at `time` until the
/// returned guard is dropped.
///
pub(crate) fn enter_host(time: SimTime, host: Arc<str>) -> HostScope {
    SCOPE.with(|scope| {
        let mut scope = scope.borrow_mut();
        scope.time = Some(time);
        scope.host = Some(host);
    });
    HostScope { _private: () }
}

/// Leaves a host scope on drop.
#[derive(Debug)]
pub(crate) struct HostScope {
    _private: (),
}

impl Drop for HostScope {
    fn drop(&mut self) {
        SCOPE.with(|scope| scope.borrow_mut().host = None);
    }
}

/// Create a new tracing subscriber with a sim formatter.
///
/// # Panics
///
/// Panics when subscriber initilization fails.
pub fn init() {
    subscriber().init();
}

/// Create a new tracing subscriber with a sim formatter, if no global
/// subscriber is set yet.
///
/// # Errors
///
/// Returns an error if a global subscriber was already installed.
pub fn try_init() -> Result<(), TryInitError> {
    subscriber().try_init()
}

fn subscriber() -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .event_format(format())
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Directive::from(FALLBACK_LOG_LEVEL))
                .from_env_lossy(),
        )
        .finish()
}

/// An instance of a simulation formatter.
#[must_use]
pub fn format() -> SimFormat {
    SimFormat { _private: () }
}

/// A formatter that includes simulation specific information into the tracing messages.
#[derive(Debug)]
pub struct SimFormat {
    _private: (),
}

macro_rules! maybe_ansi {
    ($style:ident, $ansi:ident, $writer:ident: $($t:tt)*) => {
        MaybeAnsi(format!($($t)*), $style, $ansi).write(&mut $writer)
    };
}

impl<S, N> FormatEvent<S, N> for SimFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let ansi = writer.has_ansi_escapes();

        let dimmed = Style::new().dimmed();
        let bold = Style::new().bold();

        let scope = SCOPE.with(|scope| scope.borrow().clone());
        match scope.time {
            Some(time) => maybe_ansi!(dimmed, ansi, writer: "[ {time} ] ")?,
            None => maybe_ansi!(dimmed, ansi, writer: "[ - ] ")?,
        }

        let style = match *meta.level() {
            Level::TRACE => Style::new().fg(Color::Cyan),
            Level::DEBUG => Style::new().fg(Color::Purple),
            Level::INFO => Style::new().fg(Color::Green),
            Level::WARN => Style::new().fg(Color::Yellow),
            Level::ERROR => Style::new().fg(Color::Red),
        };

        if let Some(host) = &scope.host {
            if !ansi {
                write!(writer, "{} ", meta.level().as_str())?;
            }
            maybe_ansi!(style, ansi, writer: "{host} ")?;
        } else {
            maybe_ansi!(style, ansi, writer: "{} ", meta.level().as_str())?;
        }

        if let Some(scope) = ctx.event_scope() {
            let mut seen = false;
            for span in scope.from_root() {
                maybe_ansi!(bold, ansi, writer: "{}", span.metadata().name())?;
                seen = true;
                let ext = span.extensions();
                if let Some(fields) = &ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        maybe_ansi!(bold, ansi, writer: "{{")?;
                        write!(writer, "{fields}")?;
                        maybe_ansi!(bold, ansi, writer: "}}")?;
                    }
                }
                maybe_ansi!(dimmed, ansi, writer: ":")?;
            }

            if seen {
                writer.write_char(' ')?;
            }
        }

        maybe_ansi!(dimmed, ansi, writer: "{}: ", meta.target())?;

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

struct MaybeAnsi(String, Style, bool);

impl MaybeAnsi {
    fn write(self, writer: &mut Writer<'_>) -> std::fmt::Result {
        if self.2 {
            write!(writer, "{}", self.1.prefix())?;
            write!(writer, "{}", self.0)?;
            write!(writer, "{}", self.1.suffix())
        } else {
            write!(writer, "{}", self.0)
        }
    }
}
