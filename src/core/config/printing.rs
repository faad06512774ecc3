use crate::core::config::data::{path_display, Config};

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        println!("  endpoint: {}", self.endpoint());
        println!("  request-timeout: {}s", self.request_timeout().as_secs());
        match self.reveal_tick().as_millis() {
            0 => println!("  reveal-tick: off"),
            ms => println!("  reveal-tick: {ms}ms"),
        }
        println!("  persist-every: {}", self.persist_every());
        match self.resume_history() {
            true => println!("  resume-history: on"),
            false => println!("  resume-history: off"),
        }
        match self.storage_dir() {
            Some(dir) => println!("  data-dir: {}", path_display(dir)),
            None => println!("  data-dir: (unavailable)"),
        }
    }
}
