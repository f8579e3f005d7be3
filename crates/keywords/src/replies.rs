//! Canned reply texts for the Keywords command surface.

pub const HELP: &str = "Keywords extension help (admin only!):\n\
    \n\
    - Type *keyword list* for the list of keywords\n\
    - Type *keyword add* _new_keyword message to display_ to add new keywords\n\
    - Type *keyword quickadd* _new_keyword_ #channel1 #channel2 to add new keywords by using the template\n\
    - Type *keyword delete* _existing_keyword_ to delete a keyword\n\
    - Type *keyword template* _new template_ to change the quickadd template\n\
    - Type *keyword config* to change my behavior\n\
    \n\
    *Attention!* Actions are performed without confirmation";

pub const DID_NOT_UNDERSTAND: &str = "I didn't understand your request, could you retry?";

pub const ADD_CONFIRMATION: &str = "Thanks! I'll reply to {keyword} now";

pub const DELETE_UNKNOWN: &str = "This keyword doesn't exist";

pub const DELETE_CONFIRMATION: &str = "Thanks! I won't reply to {keyword} anymore";

pub const TEMPLATE_MISSING_PLACEHOLDER: &str = "I didn't see the {channels} part in your template";

pub const TEMPLATE_CONFIRMATION: &str = "Thanks! I'll use this new template now";

pub const QUICKADD_MISSING_CHANNEL: &str = "I didn't see a link to a channel in your request";

pub const LIST_HEADER: &str = "Here is the list of configured keywords";

pub const LIST_EMPTY: &str = "I have no keywords configured yet";

pub const CONFIG_HEADER: &str = "Hello!\n\
    Welcome to the configuration page to change my behavior\n\
    \n\
    Type *keyword config* _key_ _value_ to change a value\n\
    \n\
    List of configuration keys:";

pub const CONFIG_FOOTER: &str = "_Note:_ Enabling both _reply_in_thread_ and _reply_in_ephemeral_ \
    mean users will receive 2 messages\n\
    \n\
    *Attention!* Actions are performed without confirmation";

pub const CONFIG_CONFIRMATION: &str = "Thanks! Configuration modified.";

pub const CONFIG_UNKNOWN_KEY: &str = "I don't know that parameter...";

pub const CONFIG_INVALID_VALUE: &str = "This setting can't be modified in this way. Sorry!";

/// Default template used by `quickadd` keywords until an admin replaces it.
pub const DEFAULT_TEMPLATE: &str = "Hello and welcome!\n\
    Based on your message, you may want to join {channels}\n\
    --\n\
    _Note: I am a bot (bleep blop!)._ I can be wrong. If I am in the way, please contact a moderator.";
