// Hookmap CLI
// Validates a policy and rule set, and replays scripted sessions against
// simulated keyboards

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use clap::Parser;
use parking_lot::Mutex;
use serde::Deserialize;

use hookmap_core::device::{DeviceIdentifier, DeviceType, SimulatedKeyboard};
use hookmap_core::hook::{KeyboardEventCallback, SlotBinding, Target, UpdateFlagsCallback};
use hookmap_core::rule::{decode_words, records_from_toml, RuleRecord};
use hookmap_core::{
    DeviceId, EngineConfig, EventType, Flags, HookableKeyboard, KeyCode, KeyEvent, KeyboardType,
    ModifierFlag, Policy, RemapEngine, RuleList,
};

/// Device hook and remap engine harness
#[derive(Parser, Debug)]
#[command(name = "hookmap")]
#[command(version)]
#[command(about = "Validate hookmap configuration and replay scripted key sessions", long_about = None)]
struct Args {
    /// Policy TOML file (defaults to the user config location)
    #[arg(short, long, value_name = "FILE")]
    policy: Option<PathBuf>,

    /// Rule file: TOML `[[rule]]` tables, or a `.words` word stream
    #[arg(short, long, value_name = "FILE")]
    rules: PathBuf,

    /// Session script to replay
    #[arg(short, long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Validate configuration, print the rules and exit
    #[arg(long)]
    check_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Deserialize)]
struct Script {
    #[serde(default)]
    device: Vec<ScriptDevice>,
    #[serde(default)]
    event: Vec<ScriptEvent>,
}

#[derive(Debug, Deserialize)]
struct ScriptDevice {
    id: u64,
    name: Option<String>,
    vendor: u32,
    product: u32,
    #[serde(default)]
    location: u32,
    #[serde(default)]
    device_type: DeviceType,
    #[serde(default)]
    num_lock: bool,
    #[serde(default)]
    caps_lock_led: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ScriptEventKind {
    Down,
    Up,
    Modify,
    Flags,
    Detach,
}

#[derive(Debug, Deserialize)]
struct ScriptEvent {
    device: u64,
    #[serde(rename = "type")]
    kind: ScriptEventKind,
    key: Option<String>,
    #[serde(default)]
    flags: Vec<ModifierFlag>,
    /// Driver flag word, merged with `flags`
    raw_flags: Option<u32>,
    #[serde(default)]
    repeat: bool,
    keyboard_type: Option<u32>,
}

/// Lines printed by original callbacks, in delivery order
type Transcript = Arc<Mutex<Vec<String>>>;

struct Application {
    args: Args,
    policy: Policy,
    records: Vec<RuleRecord>,
}

impl Application {
    fn new(args: Args) -> Result<Self, Box<dyn std::error::Error>> {
        let policy = match &args.policy {
            Some(path) => Policy::from_file(path)?,
            None => Policy::load_default()?,
        };
        let records = load_records(&args.rules)?;
        Ok(Self {
            args,
            policy,
            records,
        })
    }

    fn check_config(&self) -> Result<(), Box<dyn std::error::Error>> {
        match self.policy.source_path() {
            Some(path) => println!("Policy: {}", path.display()),
            None => println!("Policy: defaults"),
        }
        for (toggle, value) in self.policy.toggles() {
            println!("  {} = {}", toggle, value);
        }

        let rules = RuleList::build(&self.records);
        println!("Rules: {}", rules.len());
        for (index, record) in self.records.iter().enumerate() {
            let values: Vec<String> = record
                .values
                .iter()
                .map(|pair| format!("{}={}", pair.tag, pair.value))
                .collect();
            println!("  #{} {} [{}]", index, record.remap_type, values.join(", "));
        }
        println!("Configuration is valid");
        Ok(())
    }

    fn replay(&self, script_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let script: Script = toml::from_str(&fs::read_to_string(script_path)?)?;
        let config = EngineConfig::default();
        let engine = RemapEngine::with_config(config)?;
        engine.set_policy(self.policy.clone());
        engine.load_rules(RuleList::build(&self.records));

        let transcript: Transcript = Arc::new(Mutex::new(Vec::new()));
        let mut devices: Vec<Arc<SimulatedKeyboard>> = Vec::new();
        for described in &script.device {
            let device = Arc::new(simulated_device(described, &transcript));
            let hooked = engine.attach(device.clone());
            println!(
                "attach {} {} ({}) hooked:{}",
                device.id(),
                device.identifier(),
                described.device_type,
                hooked
            );
            devices.push(device);
        }

        for event in &script.event {
            let Some(device) = devices.iter().find(|d| d.id() == DeviceId(event.device)) else {
                log::warn!("script event for unknown device {}", event.device);
                continue;
            };
            let mut flags: Flags = event.flags.iter().copied().collect();
            if let Some(raw) = event.raw_flags {
                flags = flags | Flags::from_raw(raw);
            }
            match event.kind {
                ScriptEventKind::Flags => {
                    device.dispatch_flags(flags);
                }
                ScriptEventKind::Detach => {
                    engine.detach(device.id());
                    transcript.lock().push(format!("detach {}", device.id()));
                }
                kind => {
                    let name = event.key.as_deref().ok_or("key event without key")?;
                    let key: KeyCode = name
                        .parse()
                        .map_err(|_| format!("unknown key name: {}", name))?;
                    let event_type = match kind {
                        ScriptEventKind::Down => EventType::Down,
                        ScriptEventKind::Up => EventType::Up,
                        _ => EventType::Modify,
                    };
                    let mut key_event = KeyEvent::new(event_type, key, flags).with_repeat(event.repeat);
                    if let Some(keyboard_type) = event.keyboard_type {
                        key_event = key_event.with_keyboard_type(KeyboardType(keyboard_type));
                    }
                    if !device.dispatch_key(&key_event, Default::default()) {
                        log::warn!("{} has an empty keyboard event slot", device.id());
                    }
                }
            }
        }

        // Let the LED timer settle
        thread::sleep(config.led_sync_delay * 10);

        for line in transcript.lock().iter() {
            println!("{}", line);
        }
        println!("flags: {}", engine.flag_status());
        for device in &devices {
            println!(
                "{} caps_lock_led:{} (writes {}) num_lock:{} (writes {})",
                device.id(),
                device.alpha_lock(),
                device.alpha_lock_writes(),
                device.num_lock(),
                device.num_lock_writes()
            );
        }
        Ok(())
    }

    fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.args.check_config {
            return self.check_config();
        }
        match &self.args.script {
            Some(script) => self.replay(script),
            None => self.check_config(),
        }
    }
}

/// Rules from a TOML file, or a `.words` file of whitespace separated words
fn load_records(path: &Path) -> Result<Vec<RuleRecord>, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    if path.extension().is_some_and(|ext| ext == "words") {
        let words = content
            .split_whitespace()
            .map(parse_word)
            .collect::<Result<Vec<u32>, _>>()?;
        Ok(decode_words(&words)?)
    } else {
        Ok(records_from_toml(&content)?)
    }
}

fn parse_word(word: &str) -> Result<u32, std::num::ParseIntError> {
    match word.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => word.parse(),
    }
}

/// A simulated keyboard whose originals append to `transcript`
fn simulated_device(described: &ScriptDevice, transcript: &Transcript) -> SimulatedKeyboard {
    let keys = Arc::clone(transcript);
    let flags = Arc::clone(transcript);
    SimulatedKeyboard::new(
        DeviceId(described.id),
        DeviceIdentifier::new(described.vendor, described.product, described.location),
        described.device_type,
    )
    .with_name(Some(described.name.as_deref().unwrap_or(SimulatedKeyboard::DEFAULT_NAME)))
    .with_num_lock(described.num_lock)
    .with_alpha_lock(described.caps_lock_led)
    .with_keyboard_event(SlotBinding::new(
        KeyboardEventCallback::new(move |_, event, ts, sender| {
            keys.lock().push(format!("{} @{} {}", sender, ts, event));
        }),
        Target(described.id),
    ))
    .with_update_flags(SlotBinding::new(
        UpdateFlagsCallback::new(move |_, value, sender| {
            flags
                .lock()
                .push(format!("{} flags:{} ({:#010x})", sender, value, value.to_raw()));
        }),
        Target(described.id),
    ))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let app = Application::new(args)?;
    app.run()
}
