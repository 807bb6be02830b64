//! Counter names and increment helpers over the `metrics` facade.
//!
//! The Prometheus recorder is installed by the binary; everything here is a
//! no-op until then, which keeps tests quiet.

pub const RECEIVED_MESSAGES: &str = "fambot_received_messages_total";
pub const SENT_MESSAGES: &str = "fambot_sent_messages_total";
pub const COMMAND_CALLS: &str = "fambot_command_calls_total";
pub const DIGEST_RUNS: &str = "fambot_digest_runs_total";

/// Register help texts with the installed recorder.
pub fn describe() {
    metrics::describe_counter!(RECEIVED_MESSAGES, "Total number of received messages");
    metrics::describe_counter!(SENT_MESSAGES, "Total number of sent messages");
    metrics::describe_counter!(COMMAND_CALLS, "Total number of command calls");
    metrics::describe_counter!(DIGEST_RUNS, "Total number of digest job runs");
}

pub fn inc_received() {
    metrics::counter!(RECEIVED_MESSAGES).increment(1);
}

pub fn inc_sent() {
    metrics::counter!(SENT_MESSAGES).increment(1);
}

pub fn inc_command_call(command: &'static str) {
    metrics::counter!(COMMAND_CALLS, "command" => command).increment(1);
}

pub fn inc_digest_run() {
    metrics::counter!(DIGEST_RUNS).increment(1);
}
