//! Argument parsing and command dispatch.
//!
//! Each invocation runs exactly one [`Command`] against a [`Backend`] and
//! prints human-readable lines. Ids are printed in full so they can be
//! pasted back into the next command.

use std::collections::HashMap;
use std::io::Write;

use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand};

use hearth_shared::types::{FriendshipId, GroupId, MemberId, MessageId, UserId};
use hearth_store::{
    reaction_counts, Backend, CallDirection, CallKind, CallLog, DataStore, MemberPermission,
    NewGroup, Profile, ProfilePatch, User, UserPatch,
};

const PERMISSIONS: &str = "admin|moderator|edit-settings|ban|kick";

#[derive(Parser, Debug)]
#[command(name = "hearth")]
#[command(about = "Local accounts, groups, friends and call history")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create an account and sign in
    Signup {
        email: String,
        password: String,
        username: String,
    },
    Login {
        email: String,
        password: String,
    },
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Show the signed-in profile, updating any field given
    Profile {
        #[arg(long)]
        username: Option<String>,
        /// Empty clears the avatar
        #[arg(long)]
        avatar: Option<String>,
        /// Empty clears the bio
        #[arg(long)]
        bio: Option<String>,
    },

    /// Find profiles by username
    Search { query: String },
    Friends,
    /// Pending friend requests sent to you
    Requests,
    AddFriend { username: String },
    Accept {
        #[arg(value_name = "REQUEST_ID")]
        request: FriendshipId,
    },
    Reject {
        #[arg(value_name = "REQUEST_ID")]
        request: FriendshipId,
    },

    /// Groups you belong to
    Groups,
    /// Create a group you own, adding the named users as members
    CreateGroup {
        name: String,
        #[arg(value_name = "USERNAME")]
        invitees: Vec<String>,
    },
    Join {
        #[arg(value_name = "INVITE_CODE")]
        code: String,
    },
    Members {
        #[arg(value_name = "GROUP_ID")]
        group: GroupId,
    },
    Kick {
        #[arg(value_name = "MEMBER_ID")]
        member: MemberId,
    },
    Ban {
        #[arg(value_name = "MEMBER_ID")]
        member: MemberId,
    },
    /// Give a member one right
    Grant {
        #[arg(value_name = "MEMBER_ID")]
        member: MemberId,
        #[arg(value_name = PERMISSIONS)]
        permission: MemberPermission,
    },
    /// Take one right away from a member
    Revoke {
        #[arg(value_name = "MEMBER_ID")]
        member: MemberId,
        #[arg(value_name = PERMISSIONS)]
        permission: MemberPermission,
    },
    Send {
        #[arg(value_name = "GROUP_ID")]
        group: GroupId,
        #[arg(value_name = "MESSAGE", required = true, trailing_var_arg = true)]
        words: Vec<String>,
    },
    Messages {
        #[arg(value_name = "GROUP_ID")]
        group: GroupId,
    },
    React {
        #[arg(value_name = "MESSAGE_ID")]
        message: MessageId,
        emoji: String,
    },
    Unreact {
        #[arg(value_name = "MESSAGE_ID")]
        message: MessageId,
    },

    /// Call history, newest first, optionally filtered by username
    Calls { query: Option<String> },
    ClearCalls,
}

/// Run one command against `backend`, writing its output to `out`.
pub fn run(backend: &Backend, command: Command, out: &mut impl Write) -> anyhow::Result<()> {
    let data = backend.data();

    match command {
        // ---- account
        Command::Signup {
            email,
            password,
            username,
        } => {
            let user = backend.signup(&email, &password, &username)?;
            writeln!(out, "Welcome, {}! Signed in as {}", user.username, user.email)?;
        }
        Command::Login { email, password } => {
            let user = backend.login(&email, &password)?;
            writeln!(out, "Signed in as {} ({})", user.username, user.id)?;
        }
        Command::Logout => {
            backend.logout()?;
            writeln!(out, "Signed out")?;
        }
        Command::Whoami => match backend.current_user() {
            Some(user) => writeln!(out, "{} <{}> {}", user.username, user.email, user.id)?,
            None => writeln!(out, "Not signed in")?,
        },
        Command::Profile {
            username,
            avatar,
            bio,
        } => {
            let user = signed_in(backend)?;
            if username.is_some() || avatar.is_some() {
                backend.update_profile(&UserPatch {
                    username,
                    avatar_url: avatar.map(non_empty),
                })?;
            }
            if let Some(bio) = bio {
                data.update_my_profile(&ProfilePatch {
                    bio: Some(non_empty(bio)),
                    ..ProfilePatch::default()
                })?;
            }
            let profile = data
                .get_profile(user.id)?
                .ok_or_else(|| anyhow!("no profile for {}", user.username))?;
            print_profile(out, &profile)?;
        }

        // ---- people
        Command::Search { query } => {
            signed_in(backend)?;
            for p in data.search_profiles(&query)? {
                let status = match data.friendship_with(p.id)? {
                    Some(f) => format!("{:?}", f.status).to_lowercase(),
                    None => "-".to_string(),
                };
                writeln!(out, "{}  {:<20} {}", p.id, p.username, status)?;
            }
        }
        Command::Friends => {
            signed_in(backend)?;
            let friends = data.get_friends()?;
            if friends.is_empty() {
                writeln!(out, "No friends yet")?;
            }
            for p in friends {
                writeln!(out, "{}  {}", p.id, p.username)?;
            }
        }
        Command::Requests => {
            signed_in(backend)?;
            let names = usernames(data)?;
            for req in data.incoming_friend_requests()? {
                writeln!(out, "{}  from {}", req.id, name_of(&names, req.sender_id))?;
            }
        }
        Command::AddFriend { username } => {
            signed_in(backend)?;
            let profile = profile_named(data, &username)?;
            match data.send_friend_request(profile.id)? {
                Some(_) => writeln!(out, "Friend request sent to {}", profile.username)?,
                None => writeln!(
                    out,
                    "Nothing sent: you and {} already have a request on file",
                    profile.username
                )?,
            }
        }
        Command::Accept { request } => {
            let f = data.accept_friend_request(request)?;
            writeln!(out, "Accepted request {}", f.id)?;
        }
        Command::Reject { request } => {
            let f = data.reject_friend_request(request)?;
            writeln!(out, "Rejected request {}", f.id)?;
        }

        // ---- groups
        Command::Groups => {
            signed_in(backend)?;
            for mine in data.list_my_groups()? {
                let g = &mine.group;
                let role = if mine.is_admin { "admin" } else { "member" };
                writeln!(out, "{}  {:<24} {:<6} invite {}", g.id, g.name, role, g.invite_code)?;
            }
        }
        Command::CreateGroup { name, invitees } => {
            let user = signed_in(backend)?;
            let ids = invitees
                .iter()
                .map(|n| profile_named(data, n).map(|p| p.id))
                .collect::<anyhow::Result<Vec<UserId>>>()?;
            let group = data.create_group_as_owner(NewGroup::named(name, user.id), &ids)?;
            writeln!(
                out,
                "Created {} ({}), invite code {}",
                group.name, group.id, group.invite_code
            )?;
        }
        Command::Join { code } => {
            let member = data.join_group(&code)?;
            let name = data
                .get_group_by_id(member.group_id)?
                .map(|g| g.name)
                .unwrap_or_default();
            writeln!(out, "Joined {} ({})", name, member.group_id)?;
        }
        Command::Members { group } => {
            signed_in(backend)?;
            let names = usernames(data)?;
            for m in data.get_group_members(group)? {
                let mut roles = Vec::new();
                if m.rights.is_admin {
                    roles.push("admin");
                }
                if m.rights.is_moderator {
                    roles.push("moderator");
                }
                writeln!(
                    out,
                    "{}  {:<20} {}",
                    m.id,
                    name_of(&names, m.user_id),
                    roles.join(",")
                )?;
            }
        }
        Command::Kick { member } => {
            let m = data.kick_member(member)?;
            writeln!(out, "Removed {} from the group", m.user_id)?;
        }
        Command::Ban { member } => {
            let m = data.ban_member(member)?;
            writeln!(out, "Banned {}", m.user_id)?;
        }
        Command::Grant { member, permission } => {
            data.set_member_permission(member, permission, true)?;
            writeln!(out, "Granted {permission:?} for {member}")?;
        }
        Command::Revoke { member, permission } => {
            data.set_member_permission(member, permission, false)?;
            writeln!(out, "Revoked {permission:?} for {member}")?;
        }
        Command::Send { group, words } => {
            signed_in(backend)?;
            let content = words.join(" ");
            if content.trim().is_empty() {
                bail!("message is empty");
            }
            let msg = data
                .send_group_message(group, &content)?
                .ok_or_else(|| anyhow!("not signed in"))?;
            writeln!(out, "Sent {}", msg.id)?;
        }
        Command::Messages { group } => {
            signed_in(backend)?;
            let names = usernames(data)?;
            for msg in data.get_group_messages(group)? {
                let mut line = format!(
                    "[{}] {}: {}",
                    msg.created_at.format("%Y-%m-%d %H:%M"),
                    name_of(&names, msg.sender_id),
                    msg.content
                );
                let counts = reaction_counts(&msg);
                if !counts.is_empty() {
                    let shown: Vec<String> =
                        counts.iter().map(|(e, n)| format!("{e} {n}")).collect();
                    line.push_str(&format!("  ({})", shown.join(", ")));
                }
                writeln!(out, "{line}  #{}", msg.id)?;
            }
        }
        Command::React { message, emoji } => {
            signed_in(backend)?;
            data.react_to_message(message, &emoji)?;
            writeln!(out, "Reacted {emoji}")?;
        }
        Command::Unreact { message } => {
            signed_in(backend)?;
            data.remove_reaction(message)?;
            writeln!(out, "Reaction removed")?;
        }

        // ---- calls
        Command::Calls { query } => {
            signed_in(backend)?;
            let names = usernames(data)?;
            let logs = data.search_call_logs(query.as_deref().unwrap_or(""))?;
            if logs.is_empty() {
                writeln!(out, "No calls")?;
            }
            for log in logs {
                writeln!(out, "{}", describe_call(&log, &names))?;
            }
        }
        Command::ClearCalls => {
            signed_in(backend)?;
            data.clear_call_logs()?;
            writeln!(out, "Call history cleared")?;
        }
    }

    Ok(())
}

fn signed_in(backend: &Backend) -> anyhow::Result<User> {
    backend
        .current_user()
        .ok_or_else(|| anyhow!("not signed in; run `hearth login <email> <password>` first"))
}

/// Empty input clears an optional field.
fn non_empty(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn usernames(data: &DataStore) -> anyhow::Result<HashMap<UserId, String>> {
    Ok(data
        .profiles()?
        .into_iter()
        .map(|p| (p.id, p.username))
        .collect())
}

fn name_of(names: &HashMap<UserId, String>, id: UserId) -> String {
    names.get(&id).cloned().unwrap_or_else(|| id.short())
}

fn profile_named(data: &DataStore, username: &str) -> anyhow::Result<Profile> {
    let wanted = username.trim().to_lowercase();
    match data
        .profiles()?
        .into_iter()
        .find(|p| p.username.to_lowercase() == wanted)
    {
        Some(p) => Ok(p),
        None => bail!("no user named {username:?}"),
    }
}

fn print_profile(out: &mut impl Write, profile: &Profile) -> std::io::Result<()> {
    writeln!(out, "{}  {}", profile.id, profile.username)?;
    if let Some(bio) = &profile.bio {
        writeln!(out, "  bio:    {bio}")?;
    }
    if let Some(avatar) = &profile.avatar_url {
        writeln!(out, "  avatar: {avatar}")?;
    }
    Ok(())
}

fn describe_call(log: &CallLog, names: &HashMap<UserId, String>) -> String {
    let kind = match log.kind {
        CallKind::Voice => "voice",
        CallKind::Video => "video",
    };
    let direction = match log.direction {
        CallDirection::Outgoing => "outgoing",
        CallDirection::Incoming => "incoming",
        CallDirection::Missed => "missed",
    };
    let mut line = format!(
        "{}  {:<8} {} call with {}",
        log.timestamp.format("%Y-%m-%d %H:%M"),
        direction,
        kind,
        name_of(names, log.user_id)
    );
    if let Some(secs) = log.duration_secs {
        line.push_str(&format!(" ({}:{:02})", secs / 60, secs % 60));
    }
    line
}
