use bpaf::{OptionParser, Parser, construct, long, positional, short};
use std::path::PathBuf;
use utils::CleanupPolicy;
use utils::trailer::DEFAULT_RESERVED_SPACE;

#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub verbose: bool,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Pack(PackArgs),
    Stamp(StampArgs),
    Inspect(InspectArgs),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackArgs {
    pub passenger: PathBuf,
    pub prerequisite: Option<PathBuf>,
    pub prerequisite_args: Option<String>,
    pub gate_path: Option<String>,
    pub cleanup: Option<CleanupPolicy>,
    pub temp_prefix: Option<String>,
    pub manifest: Option<PathBuf>,
    pub reserve: u32,
    pub runtime: Option<PathBuf>,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StampArgs {
    pub params: String,
    pub output: Option<PathBuf>,
    pub launcher: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InspectArgs {
    pub json: bool,
    pub launcher: PathBuf,
}

fn parse_cleanup(value: String) -> Result<CleanupPolicy, String> {
    match value.as_str() {
        "leave" | "leave-on-disk" => Ok(CleanupPolicy::LeaveOnDisk),
        "delete" | "delete-after-launch" => Ok(CleanupPolicy::DeleteAfterLaunch),
        other => Err(format!("unknown cleanup policy '{other}', expected leave or delete")),
    }
}

fn pack() -> impl Parser<Command> {
    let passenger = long("passenger")
        .help("Program the launcher extracts and starts")
        .argument::<PathBuf>("FILE");
    let prerequisite = long("prerequisite")
        .help("Installer run first when the gate reports the prerequisite missing")
        .argument::<PathBuf>("FILE")
        .optional();
    let prerequisite_args = long("prerequisite-args")
        .help("Command line passed to the prerequisite installer")
        .argument::<String>("ARGS")
        .optional();
    let gate_path = long("gate-path")
        .help("The prerequisite counts as installed when this path exists")
        .argument::<String>("PATH")
        .optional();
    let cleanup = long("cleanup")
        .help("What to do with extracted files after launch: leave or delete")
        .argument::<String>("POLICY")
        .parse(parse_cleanup)
        .optional();
    let temp_prefix = long("temp-prefix")
        .help("Prefix of extracted temp file names")
        .argument::<String>("PREFIX")
        .optional();
    let manifest = long("manifest")
        .help("JSON manifest; flags override its fields")
        .argument::<PathBuf>("FILE")
        .optional();
    let reserve = long("reserve")
        .help("Bytes of parameter space to reserve in the trailer")
        .argument::<u32>("BYTES")
        .fallback(DEFAULT_RESERVED_SPACE);
    let runtime = long("runtime")
        .help("Launcher stub to embed into [default: carryonrt next to this executable]")
        .argument::<PathBuf>("FILE")
        .optional();
    let output = short('o')
        .long("output")
        .help("Launcher to write")
        .argument::<PathBuf>("OUT");

    construct!(PackArgs {
        passenger,
        prerequisite,
        prerequisite_args,
        gate_path,
        cleanup,
        temp_prefix,
        manifest,
        reserve,
        runtime,
        output,
    })
    .map(Command::Pack)
    .to_options()
    .descr("Build a self-extracting launcher around a passenger executable")
    .command("pack")
}

fn stamp() -> impl Parser<Command> {
    let params = long("params")
        .help("Parameters the launcher forwards to its passenger")
        .argument::<String>("STRING");
    let output = short('o')
        .long("output")
        .help("Write the stamped launcher here instead of in place")
        .argument::<PathBuf>("OUT")
        .optional();
    let launcher = positional::<PathBuf>("LAUNCHER");

    construct!(StampArgs {
        params,
        output,
        launcher,
    })
    .map(Command::Stamp)
    .to_options()
    .descr("Write parameters into a launcher's reserved trailer")
    .command("stamp")
}

fn inspect() -> impl Parser<Command> {
    let json = long("json").help("Print as JSON").switch();
    let launcher = positional::<PathBuf>("LAUNCHER");

    construct!(InspectArgs { json, launcher })
        .map(Command::Inspect)
        .to_options()
        .descr("Show the parameter trailer of a launcher")
        .command("inspect")
}

pub fn options() -> OptionParser<CliArgs> {
    let verbose = short('v')
        .long("verbose")
        .help("Log what the packer does")
        .switch();
    let pack = pack();
    let stamp = stamp();
    let inspect = inspect();
    let command = construct!([pack, stamp, inspect]);

    construct!(CliArgs { verbose, command })
        .to_options()
        .descr("carryon packs an executable into a self-extracting launcher")
        .version(env!("CARGO_PKG_VERSION"))
}

pub fn parse_args() -> CliArgs {
    options().run()
}
