use console::{style, Style};

use crate::cli::Stage;

/// Headline for a deploy run. Non-dev stages stand out, prod the most.
pub fn deploy_header(stage: Stage, stack: &str) {
    let stage_style = match stage {
        Stage::Dev => Style::new().cyan(),
        Stage::Staging => Style::new().yellow(),
        Stage::Prod => Style::new().red().bold(),
    };
    println!(
        "\n{} {} {}",
        style("Deploying").bold(),
        stage_style.apply_to(stage),
        style(format!("(stack {})", stack)).dim()
    );
}

/// Echo a shell command before it runs, as `# <cmd>`.
pub fn command(cmd: &str) {
    println!("{}", style(format!("# {}", cmd)).dim());
}

pub fn detail(msg: &str) {
    println!("  {}", style(msg).dim());
}

pub fn success(msg: &str) {
    println!("{} {}", style("✓").bold().green(), msg);
}

pub fn warning(msg: &str) {
    eprintln!("{} {}", style("warning:").bold().yellow(), msg);
}

pub fn error(msg: &str) {
    eprintln!("{} {}", style("error:").bold().red(), msg);
}
