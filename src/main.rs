use std::path::PathBuf;

use anyhow::{anyhow, Result};
use stimforge::dsl;
use stimforge::stimulus::Stimulus;
use stimforge::validation::{self, ShaderStage};

#[derive(Debug, Default, Clone)]
struct Cli {
    stimulus: Option<PathBuf>,
    out: Option<PathBuf>,
    validate: bool,
    print_uniforms: bool,
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--stimulus" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --stimulus"));
                };
                cli.stimulus = Some(PathBuf::from(v));
                i += 2;
            }
            "--out" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --out"));
                };
                cli.out = Some(PathBuf::from(v));
                i += 2;
            }
            "--validate" => {
                cli.validate = true;
                i += 1;
            }
            "--print-uniforms" => {
                cli.print_uniforms = true;
                i += 1;
            }
            other => {
                return Err(anyhow!(
                    "unknown argument: {other} (supported: --stimulus <stimulus.json>, --out <dir>, --validate, --print-uniforms)"
                ));
            }
        }
    }
    Ok(cli)
}

fn print_uniforms(stimulus: &Stimulus) {
    let program = &stimulus.program;
    println!(
        "duration: {} frames ({} s)",
        program.duration_frames(),
        program.duration_s()
    );
    for (name, [r, g, b]) in program.colors() {
        println!("vec3  {name} = [{r}, {g}, {b}]");
    }
    for (name, [x, y]) in program.vectors() {
        println!("vec2  {name} = [{x}, {y}]");
    }
    for (name, value) in program.variables() {
        println!("float {name} = {value}");
    }
    for image in program.images() {
        println!("sampler2D {} <- {}", image.name, image.path);
    }
    for line in stimulus.log.entries() {
        println!("{line}");
    }
}

fn compile_once(stimulus_path: &std::path::Path, cli: &Cli) -> Result<()> {
    let doc = dsl::load_stimulus_from_path(stimulus_path)?;
    let stimulus = dsl::boot_document(&doc)?;
    if stimulus.is_interactive() {
        log::info!(
            "stimulus '{}' has interactive controls; saved uniforms hold their boot values",
            doc.name
        );
    }

    let fragment = stimulus.program.fragment_source();
    let vertex = stimulus.program.vertex_source();

    if cli.validate {
        validation::validate_glsl_with_context(
            &fragment,
            ShaderStage::Fragment,
            &format!("stimulus '{}'", doc.name),
        )?;
        validation::validate_glsl_with_context(
            &vertex,
            ShaderStage::Vertex,
            &format!("stimulus '{}'", doc.name),
        )?;
        println!("[validate] ok: {}", doc.name);
    }

    if cli.print_uniforms {
        print_uniforms(&stimulus);
    }

    match &cli.out {
        Some(out_dir) => {
            std::fs::create_dir_all(out_dir)
                .map_err(|e| anyhow!("failed to create output dir {}: {e}", out_dir.display()))?;
            let frag_path = out_dir.join(format!("{}.frag", doc.name));
            std::fs::write(&frag_path, &fragment)
                .map_err(|e| anyhow!("failed to write {}: {e}", frag_path.display()))?;
            println!("[headless] saved: {}", frag_path.display());
            let vert_path = out_dir.join(format!("{}.vert", doc.name));
            std::fs::write(&vert_path, &vertex)
                .map_err(|e| anyhow!("failed to write {}: {e}", vert_path.display()))?;
            println!("[headless] saved: {}", vert_path.display());
        }
        None => {
            // With no other request, behave as a compiler to stdout.
            if !cli.validate && !cli.print_uniforms {
                print!("{fragment}");
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&argv)?;

    let Some(stimulus_path) = cli.stimulus.clone() else {
        return Err(anyhow!(
            "missing --stimulus <stimulus.json> (supported: --stimulus <stimulus.json>, --out <dir>, --validate, --print-uniforms)"
        ));
    };
    compile_once(&stimulus_path, &cli)
}
