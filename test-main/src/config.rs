use dotenv::var;
use lcdi2c::LcdConfig;
use lcdi2c::hd44780::driver::CharSize;
use std::env::var_os;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Everything the test program needs to find and drive the display.
#[derive(Debug)]
pub struct Config {
    pub bus_path: PathBuf,
    pub lcd: LcdConfig,
    pub dry_run: bool,
    /// Number of clock updates before exiting, forever if `None`.
    pub updates: Option<u32>,
}

impl Config {
    /// Loads the display config from `LCDI2C_CONFIG_FILE` (or `lcd.json`) if it exists, then
    /// applies the `LCDI2C_*` environment variables on top.
    pub fn load() -> eyre::Result<Self> {
        let mut lcd = try_load_file()?.unwrap_or_default();

        if let Ok(address) = var("LCDI2C_ADDRESS") {
            lcd.address = parse_address(&address)?;
        }
        if let Ok(columns) = var("LCDI2C_COLUMNS") {
            lcd.columns = columns.parse()?;
        }
        if let Ok(rows) = var("LCDI2C_ROWS") {
            lcd.rows = rows.parse()?;
        }
        if let Ok(font) = var("LCDI2C_FONT") {
            lcd.char_size = match font.as_str() {
                "5x8" => CharSize::Dots5x8,
                "5x10" => CharSize::Dots5x10,
                _ => return Err(eyre::eyre!("Invalid font {:?}, expected 5x8 or 5x10", font)),
            };
        }
        if let Ok(backlight) = var("LCDI2C_BACKLIGHT") {
            lcd.backlight = parse_flag(&backlight)?;
        }

        let dry_run = match var("LCDI2C_DRY_RUN") {
            Ok(flag) => parse_flag(&flag)?,
            Err(_) => false,
        };
        let updates = match var("LCDI2C_UPDATES") {
            Ok(updates) => Some(updates.parse()?),
            Err(_) if dry_run => Some(3),
            Err(_) => None,
        };

        Ok(Config {
            bus_path: var("LCDI2C_BUS").unwrap_or_else(|_| "/dev/i2c-1".to_string()).into(),
            lcd,
            dry_run,
            updates,
        })
    }
}

fn try_load_file() -> eyre::Result<Option<LcdConfig>> {
    let config_str = var_os("LCDI2C_CONFIG_FILE");
    let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new("lcd.json"));
    let config_path = Path::new(config_str);
    if !config_path.exists() {
        return Ok(None);
    }
    let file = std::fs::File::open(config_path)?;
    let reader = std::io::BufReader::new(file);
    Ok(Some(serde_json::from_reader(reader)?))
}

fn parse_address(s: &str) -> eyre::Result<u8> {
    let s = s.trim();
    let address = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16)?,
        None => s.parse()?,
    };
    Ok(address)
}

fn parse_flag(s: &str) -> eyre::Result<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(eyre::eyre!("Invalid flag {:?}", s)),
    }
}
