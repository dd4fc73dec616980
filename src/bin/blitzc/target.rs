#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "snake_case")]
pub enum Target {
    Linux,
    Darwin,
}

impl From<Target> for blitz::codegen::Target {
    fn from(value: Target) -> Self {
        match value {
            Target::Linux => blitz::codegen::Target::x86_64_linux,
            Target::Darwin => blitz::codegen::Target::x86_64_darwin,
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "macos")] {
        pub const DEFAULT_TARGET: Target = Target::Darwin;
    } else {
        pub const DEFAULT_TARGET: Target = Target::Linux;
    }
}
