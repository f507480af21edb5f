use std::process::exit;
use std::str::FromStr;

use anyhow::anyhow;
use clap::{crate_authors, crate_version, App as ClapApp, Arg, ArgMatches};
use env_logger::Env;
use tokio::runtime::Runtime;

use scpidaq::{
    cancellation, connect_all, list_usb_ports, run, ChannelList, ConfValue, Error, FileSink, NullSink,
    RangeSetting, RunConfig, Setting, Sink,
};

/// `a` applies to all instruments, `a,b,c` gives one value per instrument.
fn setting<T: FromStr<Err = Error>>(arg: &str) -> scpidaq::Result<Setting<T>> {
    let mut values = arg.split(',').map(T::from_str).collect::<Result<Vec<_>, _>>()?;
    if values.len() == 1 {
        Ok(Setting::All(values.remove(0)))
    } else {
        Ok(Setting::PerInstrument(values))
    }
}

fn seconds(arg: &str, what: &str) -> scpidaq::Result<f64> {
    arg.parse()
        .map_err(|_| Error::argument(anyhow!("Cannot parse `{}` as {}", arg, what)))
}

fn apply_overrides(config: &mut RunConfig, matches: &ArgMatches) -> scpidaq::Result<()> {
    if let Some(x) = matches.value_of("mode") {
        let mut modes: Vec<String> = x.split(',').map(|x| x.trim().to_string()).collect();
        config.mode = if modes.len() == 1 {
            Setting::All(modes.remove(0))
        } else {
            Setting::PerInstrument(modes)
        };
    }
    if let Some(x) = matches.value_of("kind") {
        config.kinds = setting(x)?;
    }
    if let Some(x) = matches.values_of("port") {
        config.ports = Some(x.map(|x| x.to_string()).collect());
    }
    if let Some(x) = matches.value_of("sleep") {
        config.sleep_interval = seconds(x, "sleep interval")?;
    }
    if let Some(x) = matches.value_of("duration") {
        config.duration = seconds(x, "duration")?;
    }
    if let Some(x) = matches.value_of("range") {
        config.range = match setting::<ConfValue>(x)? {
            Setting::All(x) => Setting::All(RangeSetting::Uniform(x)),
            Setting::PerInstrument(x) => Setting::PerInstrument(x.into_iter().map(RangeSetting::Uniform).collect()),
        };
    }
    if let Some(x) = matches.value_of("resolution") {
        config.resolution = setting(x)?;
    }
    if let Some(x) = matches.value_of("channels") {
        let channels = x
            .split(',')
            .map(|x| x.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| Error::argument(anyhow!("Cannot parse `{}` as channel list", x)))?;
        config.channels = Some(Setting::All(ChannelList::new(channels)?));
    }
    if let Some(x) = matches.value_of("output") {
        config.output_path = Some(x.into());
    }
    Ok(())
}

async fn acquire(config: RunConfig, identify: bool) -> scpidaq::Result<()> {
    let plan = config.plan()?;
    let ports = match &config.ports {
        Some(ports) => ports.clone(),
        None => list_usb_ports().await?,
    };
    if ports.is_empty() {
        return Err(Error::argument(anyhow!("No serial ports given and no USB adapters found")));
    }
    let mut instruments = connect_all(&ports, &config.kinds, &config.serial, &plan.timing).await?;

    if identify {
        for instrument in instruments.iter_mut() {
            let idn = instrument.identify().await?;
            println!("{}: {}", instrument.name(), idn);
        }
    }

    let (canceller, cancelled) = cancellation();
    canceller.cancel_on_ctrl_c();

    let mut sink: Box<dyn Sink> = match &config.output_path {
        Some(path) => Box::new(FileSink::create(path).await?),
        None => Box::new(NullSink),
    };
    let records = run(&mut instruments, &plan, sink.as_mut(), cancelled).await?;
    log::info!("Collected {} records", records.len());

    for instrument in instruments.iter_mut() {
        instrument.close();
    }
    Ok(())
}

fn main() {
    let matches = ClapApp::new("SCPI data acquisition")
        .author(crate_authors!())
        .version(crate_version!())
        .about("Sample SCPI meters and scanners attached to serial ports")
        .arg(
            Arg::with_name("config")
                .long("config")
                .short('c')
                .takes_value(true)
                .help("JSON run configuration. Other options override its values."),
        )
        .arg(
            Arg::with_name("port")
                .long("port")
                .short('p')
                .takes_value(true)
                .multiple_occurrences(true)
                .help("Serial port address, e.g. /dev/ttyUSB0::9600::8N2. Repeat for more instruments."),
        )
        .arg(
            Arg::with_name("kind")
                .long("kind")
                .short('k')
                .takes_value(true)
                .help("`meter` or `scanner`, or a comma separated list with one per port"),
        )
        .arg(
            Arg::with_name("mode")
                .long("mode")
                .short('m')
                .takes_value(true)
                .help("Measurement mode: DCV, ACV, DCI, ACI, RES2, RES4, FREQ or PER"),
        )
        .arg(Arg::with_name("sleep").long("sleep").short('s').takes_value(true).help("Seconds between records"))
        .arg(
            Arg::with_name("duration")
                .long("duration")
                .short('d')
                .takes_value(true)
                .help("Length of the run in seconds"),
        )
        .arg(Arg::with_name("range").long("range").short('r').takes_value(true).help("Measurement range"))
        .arg(Arg::with_name("resolution").long("resolution").takes_value(true).help("Measurement resolution"))
        .arg(
            Arg::with_name("channels")
                .long("channels")
                .takes_value(true)
                .help("Scanner channels, e.g. 101,102,103"),
        )
        .arg(
            Arg::with_name("output")
                .long("output")
                .short('o')
                .takes_value(true)
                .help("Write records to this CSV file, replacing its contents"),
        )
        .arg(Arg::with_name("identify").long("identify").short('i').help("Print the *IDN? of every instrument"))
        .arg(Arg::with_name("verbose").long("verbose").short('v').help("Log verbose output"))
        .get_matches();

    if matches.is_present("verbose") {
        env_logger::Builder::from_env(Env::default().default_filter_or("scpidaq=debug")).init();
    } else {
        env_logger::init();
    }

    let mut config = match matches.value_of("config") {
        Some(path) => match RunConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                println!("{}", err);
                exit(1);
            }
        },
        None => RunConfig::default(),
    };
    if let Err(err) = apply_overrides(&mut config, &matches) {
        println!("{}", err);
        exit(1);
    }

    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            println!("Cannot start runtime: {}", err);
            exit(1);
        }
    };
    let identify = matches.is_present("identify");
    if let Err(err) = rt.block_on(acquire(config, identify)) {
        log::error!("Acquisition failed: {}", err);
        println!("{}", err);
        exit(1);
    }
}
