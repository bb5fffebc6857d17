/// Runtime settings of the interactive loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Printed before every line and again after a completion listing.
    pub prompt: String,
    /// Maximum number of lines kept in the in-memory history.
    pub history_size: usize,
}

impl ShellConfig {
    pub const DEFAULT_PROMPT: &'static str = "$ ";
    pub const DEFAULT_HISTORY_SIZE: usize = 1000;
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: Self::DEFAULT_PROMPT.to_string(),
            history_size: Self::DEFAULT_HISTORY_SIZE,
        }
    }
}
