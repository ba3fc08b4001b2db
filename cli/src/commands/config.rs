use typed_command_core::{Command, Context, command_schema, option};

command_schema! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct ConfigCmd {
        option compact: bool = option(["--compact"]).with_help("Print on a single line"),
        context context: Context,
    }
}

impl Command for ConfigCmd {
    fn run(&self) -> anyhow::Result<()> {
        let rendered = if self.compact {
            serde_json::to_string(&self.context)?
        } else {
            serde_json::to_string_pretty(&self.context)?
        };
        println!("{rendered}");
        Ok(())
    }
}
