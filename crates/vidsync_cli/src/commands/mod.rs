pub(crate) mod channel;
pub(crate) mod meta;
#[cfg(feature = "migrate")]
pub(crate) mod migrate;
pub(crate) mod sync;

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}
