use hoist_core::reporter::Reporter;

/// Prints pipeline progress for a human watching the terminal.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        println!("\n{title}...");
    }

    fn asset(&self, filename: &str) {
        println!("\n📦 Processing: {filename}");
    }

    fn detail(&self, label: &str, value: &str) {
        println!("   {label}: {value}");
    }

    fn success(&self, msg: &str) {
        println!("   ✅ {msg}");
    }

    fn warning(&self, msg: &str) {
        println!("   ⚠️  {msg}");
    }

    fn error(&self, msg: &str) {
        eprintln!("   ❌ {msg}");
    }
}
