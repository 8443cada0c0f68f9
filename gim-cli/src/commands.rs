use clap::Subcommand;
use serde::Serialize;
use serde_json::Value;

use gim_slo::{errors, Result};
use gim_storage::{group::Group, group_member::GroupMember, GroupStore};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a group
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        display_name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long = "type", default_value = "ldap")]
        group_type: String,
        #[arg(long, default_value = "")]
        type_props: String,
    },
    /// Show a group by id, deleted or not
    Get { id: String },
    /// Show a group by its unique name
    GetByName { name: String },
    /// List active groups
    List {
        #[arg(long, default_value_t = 0)]
        offset: u64,
        #[arg(long, default_value_t = 20)]
        limit: u64,
    },
    /// Soft delete a group
    Delete { id: String },
    /// Add a user to a group
    AddMember { group_id: String, user_id: String },
    /// List the active members of a group
    Members { group_id: String },
}

fn json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(errors::any)
}

/// Runs one command against the store and renders its result.
pub async fn execute(store: &dyn GroupStore, command: Command) -> Result<Value> {
    match command {
        Command::Create {
            name,
            display_name,
            description,
            group_type,
            type_props,
        } => {
            let group = store
                .save(Group {
                    name,
                    display_name,
                    description,
                    group_type,
                    type_props,
                    ..Default::default()
                })
                .await?;
            json(&group)
        }
        Command::Get { id } => json(&store.get(&id).await?),
        Command::GetByName { name } => json(&store.get_by_name(&name).await?),
        Command::List { offset, limit } => {
            json(&store.get_all_page(offset, limit).await?)
        }
        Command::Delete { id } => json(&store.delete(&id).await?),
        Command::AddMember { group_id, user_id } => json(
            &store
                .create_member(GroupMember::new(group_id, user_id))
                .await?,
        ),
        Command::Members { group_id } => {
            json(&store.get_members(&group_id).await?)
        }
    }
}
