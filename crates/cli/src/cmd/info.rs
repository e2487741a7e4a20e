//! Implementation of the `bake info` command.

use anyhow::Result;
use serde::Serialize;

use bakery_lib::platform::Platform;

use super::GlobalOptions;
use crate::output::{print_json, print_stat, print_warning};

#[derive(Serialize)]
struct InfoOutput {
  version: &'static str,
  platform: Option<String>,
  package_arch: Option<&'static str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  project: Option<ProjectInfo>,
}

#[derive(Serialize)]
struct ProjectInfo {
  name: String,
  root: String,
  build_dir: String,
  bin_dir: String,
  man_dir: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  artifact: Option<String>,
}

pub fn cmd_info(opts: &GlobalOptions) -> Result<()> {
  let platform = Platform::current();

  let project = if opts.config.exists() {
    let project = opts.load_project()?;
    let destinations = project.install_destinations();
    let artifact = project.package_spec()?.map(|spec| {
      bakery_lib::package::artifact(&spec.meta, &spec.out_dir)
        .path
        .display()
        .to_string()
    });
    Some(ProjectInfo {
      name: project.name().to_string(),
      root: project.root.display().to_string(),
      build_dir: project.build_dir().display().to_string(),
      bin_dir: destinations.bin_dir,
      man_dir: destinations.man_dir,
      artifact,
    })
  } else {
    None
  };

  let info = InfoOutput {
    version: env!("CARGO_PKG_VERSION"),
    platform: platform.map(|p| p.triple()),
    package_arch: platform.map(|p| p.arch.package_name()),
    project,
  };

  if opts.output.is_json() {
    return print_json(&info);
  }

  println!("bake v{}", info.version);
  println!();
  print_stat("Platform", info.platform.as_deref().unwrap_or("unknown"));
  print_stat("Package arch", info.package_arch.unwrap_or("unknown"));

  match &info.project {
    Some(project) => {
      println!();
      print_stat("Project", &project.name);
      print_stat("Root", &project.root);
      print_stat("Build dir", &project.build_dir);
      print_stat("Bin dir", &project.bin_dir);
      print_stat("Man dir", &project.man_dir);
      if let Some(artifact) = &project.artifact {
        print_stat("Artifact", artifact);
      }
    }
    None => print_warning(&format!("No project file at {}", opts.config.display())),
  }

  Ok(())
}
