use cardpivot::categorizer::CategoryRule;
use cardpivot::error::Result;
use cardpivot::rules::builtin_rules;
use cardpivot::settings::{
    config_dir, load_settings, save_settings, settings_file_exists, settings_path, Settings,
};
use colored::Colorize;

pub fn run(write_rules: bool) -> Result<()> {
    let mut settings = if settings_file_exists() {
        println!("Settings already exist at {}", settings_path().display());
        load_settings()
    } else {
        Settings::default()
    };

    if write_rules {
        let path = config_dir().join("rules.json");
        if path.exists() {
            println!("Keeping existing rules file {}", path.display());
        } else {
            std::fs::create_dir_all(config_dir())?;
            let rules: Vec<CategoryRule> = builtin_rules();
            std::fs::write(&path, format!("{}\n", serde_json::to_string_pretty(&rules)?))?;
            println!("Wrote {} built-in rules to {}", rules.len(), path.display());
        }
        settings.rules_file = Some(path.to_string_lossy().to_string());
    }

    save_settings(&settings)?;
    println!("{} {}", "Saved".green().bold(), settings_path().display());
    println!("Next: cardpivot run ~/Downloads/*.csv");
    Ok(())
}
