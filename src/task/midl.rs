use super::{Task, TaskContext, TaskError};
use crate::{
    config::MidlConfiguration,
    staleness::{InputFileSet, OutputFileSet, StalenessChecker},
    tools::{Arguments, Compiler, ExternalCompiler},
};
use std::path::PathBuf;

/// Compiles an IDL file into a type library, header and interface-ID file.
pub struct Midl {
    configuration: MidlConfiguration,
}

impl Midl {
    pub(crate) fn new(configuration: MidlConfiguration) -> Self {
        Self { configuration }
    }

    /// Response file lines, in the order MIDL documents its switches.
    pub(crate) fn response_file_lines(&self) -> Vec<String> {
        let configuration = &self.configuration;
        let mut lines = vec![String::from("/nologo")];

        if let Some(ref acf) = configuration.acf {
            lines.push(format!("/acf \"{}\"", acf));
        }

        if let Some(ref align) = configuration.align {
            lines.push(format!("/align {}", align));
        }

        if configuration.app_config {
            lines.push(String::from("/app_config"));
        }

        if let Some(ref char_set) = configuration.char {
            lines.push(format!("/char {}", char_set));
        }

        if let Some(ref client) = configuration.client {
            lines.push(format!("/client {}", client));
        }

        if let Some(ref cstub) = configuration.cstub {
            lines.push(format!("/cstub \"{}\"", cstub));
        }

        if let Some(ref dlldata) = configuration.dlldata {
            lines.push(format!("/dlldata \"{}\"", dlldata));
        }

        if let Some(ref env) = configuration.env {
            lines.push(format!("/env {}", env));
        }

        if let Some(ref oi) = configuration.oi {
            lines.push(format!("/Oi{}", oi));
        }

        lines.push(format!("/tlb \"{}\"", configuration.tlb));
        lines.push(format!("/h \"{}\"", configuration.header));
        lines.push(format!("/iid \"{}\"", configuration.iid));

        if let Some(ref proxy) = configuration.proxy {
            lines.push(format!("/proxy \"{}\"", proxy));
        }

        for option in &configuration.options {
            lines.push(option.to_argument());
        }

        for define in &configuration.defines {
            lines.push(format!("/D {}", define.to_argument()));
        }

        for undefine in &configuration.undefines {
            lines.push(format!("/U {}", undefine));
        }

        for include_dir in &configuration.include_dirs {
            lines.push(format!("/I \"{}\"", include_dir));
        }

        lines.push(format!("\"{}\"", configuration.filename));

        lines
    }

    fn output_files(&self) -> OutputFileSet {
        let configuration = &self.configuration;

        let mut files = vec![
            PathBuf::from(&configuration.tlb),
            PathBuf::from(&configuration.header),
            PathBuf::from(&configuration.iid),
        ];

        if let Some(ref proxy) = configuration.proxy {
            files.push(PathBuf::from(proxy));
        }

        OutputFileSet::new(files)
    }

    fn input_files(&self) -> InputFileSet {
        let mut sources = vec![PathBuf::from(&self.configuration.filename)];

        if let Some(ref acf) = self.configuration.acf {
            sources.push(PathBuf::from(acf));
        }

        InputFileSet::new(sources, vec![])
    }
}

impl Task for Midl {
    fn id(&self) -> &'static str {
        "midl"
    }

    fn target(&self) -> &str {
        &self.configuration.filename
    }

    fn needs_rebuild(&self, context: &TaskContext) -> Result<bool, TaskError> {
        let checker = StalenessChecker::new(&context.base_path);

        Ok(checker.needs_rebuild(&self.output_files(), &self.input_files())?)
    }

    fn arguments(&self, _context: &TaskContext) -> Result<Arguments, TaskError> {
        Ok(Arguments::ResponseFile(self.response_file_lines()))
    }

    fn locate_compiler(&self, context: &TaskContext) -> Option<Box<dyn Compiler>> {
        ExternalCompiler::locate(
            "midl",
            context.toolchain_configuration.midl_location.as_ref(),
            "midl",
        )
        .map(|compiler| Box::new(compiler) as Box<dyn Compiler>)
    }
}
