use std::{fs::OpenOptions, path::Path, sync::Mutex, time::Duration};

use color_eyre::Result;
use kitz_chef::{
    client::{parse_ingredients, RecipeClient},
    config::ClientConfig,
    recipe_history::{RecipeHistory, SaveOutcome, SaveRejection},
    storage::FileStorage,
    ui::{Action, UI},
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let config = ClientConfig::load()?;
    init_logging(&config.log_path)?;

    let storage = match FileStorage::open(&config.storage_path) {
        Ok(storage) => storage,
        Err(e) => {
            warn!(error = %e, "Error loading saved recipes, starting with an empty history");
            FileStorage::empty(&config.storage_path)
        }
    };
    info!(path = %storage.path().display(), "Using recipe storage");

    let mut history = RecipeHistory::load(storage);
    let client = RecipeClient::new(&config.api_url);
    let mut ui = UI::new()?;

    loop {
        history.tick();
        ui.display(&history, false)?;

        let Some(action) = ui.handle_input(&history)? else {
            continue;
        };
        match action {
            Action::Generate => {
                let Some(input) = ui.get_ingredients()? else {
                    continue;
                };
                let ingredients = parse_ingredients(&input);
                if ingredients.is_empty() {
                    continue;
                }

                history.begin_generation();
                let request = {
                    let client = client.clone();
                    tokio::spawn(async move { client.fetch_recipe(&ingredients).await })
                };
                while !request.is_finished() {
                    history.tick();
                    ui.display(&history, true)?;
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }

                match request.await? {
                    Ok(recipe) => history.show_generated(recipe),
                    Err(e) => {
                        error!(error = %e, "Error generating recipe");
                        history.show_generation_failure();
                    }
                }
            }
            Action::Save => {
                let Some(content) = history.current_recipe().map(str::to_owned) else {
                    continue;
                };
                match history.save(&content) {
                    SaveOutcome::Committed(_) => ui.notify("Recipe saved"),
                    SaveOutcome::Rejected(SaveRejection::Duplicate) => {
                        ui.notify("This recipe is already saved")
                    }
                    SaveOutcome::Rejected(_) => ui.notify("Nothing to save"),
                }
            }
            Action::History => {
                if let Some(id) = ui.select_recipe(&history, "Recipe History")? {
                    history.set_active(&id);
                }
            }
            Action::Delete => {
                if let Some(id) = ui.select_recipe(&history, "Select Recipe to Delete")? {
                    history.delete(&id);
                }
            }
            Action::ClearAll => {
                if ui.confirm("Are you sure you want to delete all saved recipes?")? {
                    history.clear_all();
                }
            }
            Action::ClearRecipe => history.clear_recipe(),
            Action::ToggleSidebar => history.toggle_sidebar(),
            Action::Quit => break,
        }
    }

    Ok(())
}

/// The terminal belongs to the UI, so logs go to a file instead.
fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
