use super::{commands, edit, maintenance, passthrough, Shell};
use crate::models::{EffectClass, Flow, Privilege};

pub(super) type Handler = fn(&mut Shell, &str) -> crate::Result<Flow>;

pub(super) struct CommandSpec {
    pub names: &'static [&'static str],
    pub usage: &'static str,
    pub summary: &'static str,
    pub class: EffectClass,
    pub privilege: Privilege,
    pub handler: Handler,
}

const fn spec(
    names: &'static [&'static str],
    usage: &'static str,
    summary: &'static str,
    class: EffectClass,
    handler: Handler,
) -> CommandSpec {
    CommandSpec {
        names,
        usage,
        summary,
        class,
        privilege: Privilege::Anyone,
        handler,
    }
}

const fn admin(mut command: CommandSpec) -> CommandSpec {
    command.privilege = Privilege::Admin;
    command
}

use EffectClass::{Mutating, Navigation, PassThrough, ReadOnly};

pub(super) static NORMAL_COMMANDS: &[CommandSpec] = &[
    spec(&["DIR", "LS"], "DIR", "list the current directory", ReadOnly, commands::list),
    spec(&["TREE"], "TREE", "show the current directory recursively", ReadOnly, commands::tree),
    spec(&["TYPE", "CAT"], "TYPE <file>", "print a file", ReadOnly, commands::type_file),
    spec(&["PWD"], "PWD", "print the current directory", ReadOnly, commands::pwd),
    spec(&["ECHO"], "ECHO <text>", "print text", ReadOnly, commands::echo),
    spec(&["WHOAMI"], "WHOAMI", "print the current user", ReadOnly, commands::whoami),
    spec(&["TRASH"], "TRASH", "list soft-deleted entries", ReadOnly, commands::list_trash),
    spec(&["HELP"], "HELP", "list commands", ReadOnly, commands::help),
    spec(&["MKDIR", "MD"], "MKDIR <name>", "create a directory", Mutating, commands::mkdir),
    spec(&["RMDIR", "RD"], "RMDIR <name>", "delete a directory and its contents", Mutating, commands::rmdir),
    spec(&["TOUCH"], "TOUCH <name>", "create an empty file", Mutating, commands::touch),
    spec(&["DEL", "RM"], "DEL <name>", "delete a file", Mutating, commands::del),
    spec(&["SOFTDEL"], "SOFTDEL [/S] <name>", "move a file or directory to the trash", Mutating, commands::softdel),
    spec(&["RESTORE"], "RESTORE <name>", "bring a trash entry back here", Mutating, commands::restore),
    spec(&["EMPTYTRASH"], "EMPTYTRASH", "purge the trash", Mutating, commands::empty_trash),
    spec(&["WRITE"], "WRITE <file> <text>", "replace a file's content", Mutating, commands::write),
    spec(&["APPEND"], "APPEND <file> <text>", "append to a file", Mutating, commands::append),
    spec(&["EDIT"], "EDIT <file>", "edit a file line by line", Mutating, edit::start),
    spec(&["SYNC"], "SYNC", "pull new disk entries into this directory", Mutating, commands::sync),
    spec(&["SAVEFS"], "SAVEFS [path]", "write the tree snapshot", Mutating, commands::save_fs),
    admin(spec(&["ADDUSER"], "ADDUSER <name>", "create a user home", Mutating, commands::add_user)),
    spec(&["CD", "CHDIR"], "CD <dir|..|~>", "change directory", Navigation, commands::cd),
    spec(&["USER"], "USER <name>", "switch user", Navigation, commands::switch_user),
    spec(&["LOGIN"], "LOGIN <password>", "authenticate the current user", Navigation, commands::login),
    admin(spec(&["MAINT"], "MAINT", "enter disk maintenance mode", Navigation, maintenance::enter)),
    spec(&["GIT"], "GIT <args>", "run git in this directory", PassThrough, passthrough::git),
    spec(&["EXEC", "RUN"], "EXEC <program> [args]", "run a program in this directory", PassThrough, passthrough::exec),
    spec(&["BUILD"], "BUILD", "build or run the project in this directory", PassThrough, passthrough::build),
    spec(&["SERVE"], "SERVE <program> [args]", "start a long-running program", PassThrough, passthrough::serve),
    spec(&["CLS", "CLEAR"], "CLS", "clear the screen", ReadOnly, commands::clear),
    spec(&["EXIT", "QUIT"], "EXIT", "save and leave", Navigation, commands::exit),
];

pub(super) static MAINTENANCE_COMMANDS: &[CommandSpec] = &[
    spec(&["DIR", "LS"], "DIR", "list the disk directory", ReadOnly, maintenance::list),
    spec(&["TYPE", "CAT"], "TYPE <file>", "print a disk file", ReadOnly, maintenance::type_file),
    spec(&["PWD"], "PWD", "print the disk cursor", ReadOnly, maintenance::pwd),
    spec(&["HELP"], "HELP", "list commands", ReadOnly, commands::help),
    spec(&["MKDIR", "MD"], "MKDIR <name>", "create a disk directory", Mutating, maintenance::mkdir),
    spec(&["CD", "CHDIR"], "CD <path>", "move the disk cursor", Navigation, maintenance::cd),
    spec(&["NORMAL"], "NORMAL", "leave maintenance mode", Navigation, maintenance::leave),
    spec(&["EXIT", "QUIT"], "EXIT", "save and leave", Navigation, commands::exit),
];

pub(super) fn commands(maintenance: bool) -> &'static [CommandSpec] {
    if maintenance {
        MAINTENANCE_COMMANDS
    } else {
        NORMAL_COMMANDS
    }
}

/// Finds `command` (already upper-cased) in the active table.
pub(super) fn lookup(maintenance: bool, command: &str) -> Option<&'static CommandSpec> {
    commands(maintenance)
        .iter()
        .find(|spec| spec.names.contains(&command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique_per_table() {
        for maintenance in [false, true] {
            let mut seen = HashSet::new();
            for spec in commands(maintenance) {
                for name in spec.names {
                    assert!(seen.insert(*name), "{name} listed twice");
                    assert_eq!(*name, name.to_uppercase());
                }
            }
        }
    }

    #[test]
    fn aliases_resolve_to_the_same_entry() {
        let dir = lookup(false, "DIR").unwrap();
        let ls = lookup(false, "LS").unwrap();
        assert!(std::ptr::eq(dir, ls));
        assert!(lookup(false, "NORMAL").is_none());
        assert!(lookup(true, "WRITE").is_none());
        assert_eq!(lookup(false, "ADDUSER").unwrap().privilege, Privilege::Admin);
    }
}
