pub mod types;

pub use types::{IdentityMap, Membership};

use tracing::{debug, info, instrument, warn};

use crate::chat::{Channel, ChannelKind, ChatService};
use crate::config::{MappingKind, MembershipSource, TeamConfig};
use crate::error::{Service, ServiceError};

/// Find a channel by name, searching public channels first, then private ones.
async fn find_channel(chat: &dyn ChatService, name: &str) -> Result<Channel, ServiceError> {
    let mut listing_failed = false;

    for kind in [ChannelKind::Public, ChannelKind::Private] {
        match chat.list_channels(kind).await {
            Ok(channels) => {
                if let Some(channel) = channels.into_iter().find(|c| c.name == name) {
                    debug!(channel = name, id = %channel.id, kind = %kind, "found channel");
                    return Ok(channel);
                }
            }
            Err(err @ (ServiceError::Authentication { .. } | ServiceError::RateLimit { .. })) => {
                return Err(err);
            }
            Err(err) => {
                warn!(kind = %kind, error = %err, "could not list channels");
                listing_failed = true;
            }
        }
    }

    if listing_failed {
        warn!(channel = name, "channel not found, but some listings failed");
    }
    Err(ServiceError::NotFound {
        service: Service::Slack,
        what: "channel",
        target: format!("#{name}"),
    })
}

/// Resolve the team from the human members of a chat channel.
///
/// Bots and deactivated accounts are skipped; each member's chat username (or
/// chat ID, per `team.mapping_kind`) is mapped to a code-host login through
/// `team.user_mapping`.
#[instrument(skip(chat, team))]
pub async fn resolve_channel(
    chat: &dyn ChatService,
    channel: &str,
    team: &TeamConfig,
) -> Result<Membership, ServiceError> {
    let identity = chat.auth_test().await?;
    debug!(user = %identity.user, team = %identity.team, "authenticated with chat service");

    let name = channel.trim_start_matches('#');
    let found = find_channel(chat, name).await?;

    let member_ids = chat.channel_members(&found.id).await?;
    debug!(members = member_ids.len(), "listed channel members");

    let mut identities = identity_map(team);
    let mut allowed = Vec::new();

    for member_id in &member_ids {
        let user = match chat.user_info(member_id).await {
            Ok(user) => user,
            Err(err) if err.is_not_found() => {
                warn!(user = %member_id, "member profile not found, skipping");
                continue;
            }
            Err(err) => return Err(err),
        };

        if user.is_bot || user.deleted {
            debug!(user = %user.name, bot = user.is_bot, deleted = user.deleted, "skipping member");
            continue;
        }

        identities.record_chat_user(&user.name, &user.id);
        let key = match team.mapping_kind {
            MappingKind::Id if identities.is_mapped(&user.id) => user.id.as_str(),
            _ => user.name.as_str(),
        };
        let login = identities.host_login(key).to_string();
        if identities.is_mapped(key) {
            debug!(chat = %key, github = %login, "mapped chat user");
        }
        allowed.push(login);
    }

    info!(members = allowed.len(), "resolved team from channel");
    Ok(Membership {
        source: MembershipSource::Channel,
        allowed,
        identities,
    })
}

/// Resolve the team from the configured allow-list; no chat calls are made.
pub fn resolve_static(team: &TeamConfig) -> Membership {
    let allowed: Vec<String> = team
        .allowed_users
        .iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();
    if allowed.is_empty() {
        info!("no allow-list configured, reporting every author");
    } else {
        info!(members = allowed.len(), "using static team allow-list");
    }
    Membership {
        source: MembershipSource::Static,
        allowed,
        identities: identity_map(team),
    }
}

fn identity_map(team: &TeamConfig) -> IdentityMap {
    let mut identities = IdentityMap::new(&team.user_mapping);
    if team.mapping_kind == MappingKind::Id {
        identities.record_paired_ids();
    }
    identities
}
