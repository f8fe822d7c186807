//! touchmap - calibrate, observe and republish touch/tablet input.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use touchmap::calibration::CalibrationMode;
use touchmap::layout::{compute_ctm, identity_ctm, read_layout, DesktopLayout, Monitor};
use touchmap::profile::{list_profiles, parse_tool_filters, Profile};
use touchmap::pump::{CalibrationRun, TouchPump};

/// Command-line arguments for touchmap.
#[derive(Parser, Debug)]
#[command(name = "touchmap")]
#[command(version, about = "Touch/tablet input calibration and monitor mapping", long_about = None)]
struct Args {
    /// Input device node to read (e.g. /dev/input/event5)
    #[arg(short, long, env = "TOUCHMAP_DEVICE")]
    device: Option<PathBuf>,

    /// Run the interactive four-corner calibration
    #[arg(short, long)]
    calibrate: bool,

    /// Use the affine fit instead of min/max when calibrating
    #[arg(long)]
    affine: bool,

    /// Dead-zone margin per side, percent of the raw range
    #[arg(long, default_value_t = 0.5)]
    margin: f64,

    /// Screen resolution for calibration as WIDTHxHEIGHT
    #[arg(short, long)]
    resolution: Option<String>,

    /// Load the saved calibration before reading events
    #[arg(short, long)]
    load: bool,

    /// List detected monitors and exit
    #[arg(long)]
    list_monitors: bool,

    /// Print layout and calibration status and exit
    #[arg(long)]
    status: bool,

    /// Emit machine-readable JSON where applicable
    #[arg(long)]
    json: bool,

    /// Target monitor index for the mapping matrix
    #[arg(short, long)]
    monitor: Option<i32>,

    /// Target monitor name for the mapping matrix
    #[arg(long)]
    monitor_name: Option<String>,

    /// Map to the entire desktop (identity matrix)
    #[arg(long)]
    map_full: bool,

    /// Save the computed mapping as a named profile
    #[arg(long, value_name = "NAME")]
    save_profile: Option<String>,

    /// Load a named mapping profile
    #[arg(long, value_name = "NAME")]
    load_profile: Option<String>,

    /// List saved profiles and exit
    #[arg(long)]
    list_profiles: bool,

    /// Apply a profile even when the layout fingerprint changed
    #[arg(long)]
    reapply: bool,

    /// Comma-separated tool filters stored with the profile
    #[arg(long, value_name = "LIST")]
    tool: Option<String>,

    /// Store the profile without the related-tool devices
    #[arg(long)]
    no_related_tools: bool,

    /// Base directory for calibration and profile files
    #[arg(long, env = "TOUCHMAP_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Override the calibration directory
    #[arg(long)]
    calibration_dir: Option<PathBuf>,

    /// Override the profile directory
    #[arg(long)]
    profile_dir: Option<PathBuf>,

    /// Republish calibrated events through a synthetic uinput device
    #[arg(long)]
    mitm: bool,

    /// With --mitm, leave the source device ungrabbed
    #[arg(long)]
    no_grab: bool,

    /// Set up and exit without entering the event loop
    #[arg(long)]
    no_loop: bool,

    /// Print udev instructions for non-root device access
    #[arg(long)]
    udev_install: bool,

    /// Verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log format (pretty|compact|json)
    #[arg(long, default_value = "pretty")]
    log_format: String,
}

fn init_logging(args: &Args) {
    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("touchmap={level}")));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match args.log_format.as_str() {
        "json" => builder.json().init(),
        "compact" => builder.compact().init(),
        _ => builder.init(),
    }
}

fn config_base(args: &Args) -> PathBuf {
    if let Some(dir) = &args.config_dir {
        return dir.clone();
    }
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("touchmap");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".config").join("touchmap")
}

fn parse_resolution(res: &str) -> Result<(i32, i32)> {
    let (w, h) = res
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("resolution must be WIDTHxHEIGHT, got {res:?}"))?;
    Ok((
        w.trim().parse().context("bad resolution width")?,
        h.trim().parse().context("bad resolution height")?,
    ))
}

fn select_monitor<'a>(args: &Args, layout: &'a DesktopLayout) -> Result<Option<&'a Monitor>> {
    if args.map_full {
        return Ok(None);
    }
    if let Some(name) = &args.monitor_name {
        return layout
            .monitor_by_name(name)
            .map(Some)
            .ok_or_else(|| anyhow!("no monitor named {name:?}"));
    }
    if let Some(index) = args.monitor {
        return layout
            .monitor_by_index(index)
            .map(Some)
            .ok_or_else(|| anyhow!("no monitor with index {index}"));
    }
    Ok(None)
}

fn print_monitors(layout: &DesktopLayout) {
    println!("Detected monitors (layout hash: {})", layout.hash);
    for m in &layout.monitors {
        let mut line = format!(
            "  [{}] {} {}x{}+{}+{}",
            m.index, m.name, m.width, m.height, m.x, m.y
        );
        if m.primary {
            line.push_str(" (primary)");
        }
        line.push_str(&format!(" rot={}", m.rotation.as_str()));
        if m.scale_x != 1.0 || m.scale_y != 1.0 {
            line.push_str(&format!(" scale={}x{}", m.scale_x, m.scale_y));
        }
        if !m.edid_hash.is_empty() {
            line.push_str(&format!(" edid={}", m.edid_hash));
        }
        println!("{line}");
    }
}

fn print_matrix(ctm: &[f64; 9]) {
    println!(
        "[{:.6} {:.6} {:.6}]\n[{:.6} {:.6} {:.6}]\n[{:.6} {:.6} {:.6}]",
        ctm[0], ctm[1], ctm[2], ctm[3], ctm[4], ctm[5], ctm[6], ctm[7], ctm[8]
    );
    let values: Vec<String> = ctm.iter().map(|v| format!("{v:.6}")).collect();
    println!(
        "Apply with: xinput set-prop <device-id> \"Coordinate Transformation Matrix\" {}",
        values.join(" ")
    );
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    if args.udev_install {
        println!("To read input devices without root, install a udev rule:");
        println!("  sudo tee /etc/udev/rules.d/99-touchmap.rules <<'EOF'");
        println!("  SUBSYSTEM==\"input\", GROUP=\"input\", MODE=\"0660\"");
        println!("  EOF");
        println!("Then add your user to the input group and reload:");
        println!("  sudo usermod -aG input $USER");
        println!("  sudo udevadm control --reload && sudo udevadm trigger");
        println!("Log out and back in for the group change to apply.");
        return Ok(());
    }

    let base = config_base(&args);
    let calibration_dir = args.calibration_dir.clone().unwrap_or_else(|| base.clone());
    let calibration_path = calibration_dir.join("calibration.ini");
    let profile_dir = args
        .profile_dir
        .clone()
        .unwrap_or_else(|| base.join("profiles"));

    if args.list_profiles {
        let profiles = list_profiles(&profile_dir)?;
        if profiles.is_empty() {
            println!("No profiles in {}", profile_dir.display());
        }
        for p in profiles {
            println!(
                "  {} -> monitor {} ({}), layout {}",
                p.name, p.monitor.name, p.monitor.index, p.layout_hash
            );
        }
        return Ok(());
    }

    // Everything below the pure-profile commands needs the desktop layout.
    let needs_layout = args.list_monitors
        || args.status
        || args.monitor.is_some()
        || args.monitor_name.is_some()
        || args.map_full
        || args.save_profile.is_some()
        || args.load_profile.is_some();

    let layout = if needs_layout {
        Some(read_layout().context(
            "cannot query the desktop layout (CTM operations need a running X11 session)",
        )?)
    } else {
        None
    };

    if args.list_monitors {
        let layout = layout.as_ref().unwrap();
        if args.json {
            println!("{}", serde_json::to_string_pretty(layout)?);
        } else {
            print_monitors(layout);
        }
        return Ok(());
    }

    if let Some(name) = &args.load_profile {
        let layout = layout.as_ref().unwrap();
        let profile = Profile::load_named(&profile_dir, name)?;
        profile.verify_layout(layout, args.reapply)?;
        println!(
            "Profile {} maps to monitor {} ({})",
            profile.name, profile.monitor.name, profile.monitor.index
        );
        print_matrix(&profile.ctm);
        if args.no_loop {
            return Ok(());
        }
    }

    let ctm = layout.as_ref().map(|layout| -> Result<[f64; 9]> {
        match select_monitor(&args, layout)? {
            Some(monitor) => {
                info!(monitor = %monitor.name, "computed monitor mapping");
                Ok(compute_ctm(layout, monitor))
            }
            None => Ok(identity_ctm()),
        }
    });

    if args.monitor.is_some() || args.monitor_name.is_some() || args.map_full {
        let ctm = ctm.as_ref().unwrap().as_ref().map_err(|e| anyhow!("{e}"))?;
        print_matrix(ctm);
    }

    if let Some(name) = &args.save_profile {
        let layout = layout.as_ref().unwrap();
        let monitor = select_monitor(&args, layout)?
            .ok_or_else(|| anyhow!("--save-profile needs --monitor or --monitor-name"))?;
        let mut profile = Profile::new(name, layout, monitor, compute_ctm(layout, monitor));
        profile.include_related = !args.no_related_tools;
        if let Some(tools) = &args.tool {
            profile.tool_filters = parse_tool_filters(tools);
        }
        let path = profile.save(&profile_dir)?;
        println!("Saved profile {}", path.display());
    }

    if args.status {
        let layout = layout.as_ref().unwrap();
        if args.json {
            println!("{}", serde_json::to_string_pretty(layout)?);
        } else {
            println!("=== Status ===");
            print_monitors(layout);
            if calibration_path.exists() {
                println!("Calibration file: {}", calibration_path.display());
            } else {
                println!("No calibration file at {}", calibration_path.display());
            }
            println!("Profiles directory: {}", profile_dir.display());
        }
        return Ok(());
    }

    let wants_pump = args.calibrate || args.mitm || !args.no_loop;
    if !wants_pump {
        return Ok(());
    }

    let pump = TouchPump::new();
    match &args.device {
        Some(path) => pump.start(path)?,
        None => pump.start_auto()?,
    }
    println!(
        "Reading {}",
        pump.selected_device().unwrap_or_default().display()
    );

    if args.load {
        match pump.load_calibration(&calibration_path) {
            Ok(()) => println!("Loaded calibration from {}", calibration_path.display()),
            Err(e) => warn!("calibration not loaded: {e}"),
        }
    }

    if args.calibrate {
        let (width, height) = match &args.resolution {
            Some(res) => parse_resolution(res)?,
            None => {
                let cal = pump.calibration();
                (cal.screen_width, cal.screen_height)
            }
        };
        let mut run = CalibrationRun::new(width, height);
        run.margin_percent = args.margin;
        run.mode = if args.affine {
            CalibrationMode::Affine
        } else {
            CalibrationMode::MinMax
        };
        pump.run_calibration_with(run, |msg| println!("{msg}"))?;

        std::fs::create_dir_all(&calibration_dir)?;
        pump.save_calibration(&calibration_path)?;
        println!("Calibration saved to {}", calibration_path.display());
    }

    if args.mitm {
        pump.enable_mitm(true, !args.no_grab)?;
        println!("MITM republisher enabled");
    }

    if args.no_loop {
        return Ok(());
    }

    println!("Waiting for touch events (ctrl-c to quit)...");
    while pump.is_running() {
        if let Some(event) = pump.wait_for_event(Some(Duration::from_secs(1))) {
            println!(
                "{:<10} count={} x={} y={} value={}",
                format!("{:?}", event.kind),
                event.touch_count,
                event.x,
                event.y,
                event.value
            );
        }
    }
    bail!("input device stopped delivering events")
}
