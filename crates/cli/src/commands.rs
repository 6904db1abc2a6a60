use clap::Subcommand;
use model::pagination::sort::SortOrder;

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch one page of a collection and remember where you were
    List {
        #[arg(long = "type", help = "Collection type to page through")]
        collection_type: String,

        #[arg(long, help = "Pager id the view state is stored under (defaults to the type)")]
        id: Option<String>,

        #[arg(long, conflicts_with = "file", help = "Base URL of the REST endpoint")]
        url: Option<String>,

        #[arg(long, help = "JSON document mapping collection types to arrays of objects")]
        file: Option<String>,

        #[arg(long, help = "Page to show, starting at 1")]
        page: Option<String>,

        #[arg(long, help = "Objects per page")]
        page_size: Option<String>,

        #[arg(long, help = "Attribute to sort by")]
        sort: Option<String>,

        #[arg(long, help = "Sort direction: asc or desc")]
        order: Option<SortOrder>,

        #[arg(
            long = "filter",
            value_name = "ATTR=VALUE",
            help = "Filter on an attribute; repeat for more. Replaces the stored filters"
        )]
        filters: Vec<String>,

        #[arg(
            long,
            value_name = "ATTR",
            requires = "filters",
            help = "Match this filter attribute exactly"
        )]
        exact: Vec<String>,

        #[arg(long, conflicts_with = "filters", help = "Drop all stored filters")]
        clear_filters: bool,

        #[arg(long, help = "Comma separated attributes to show in the table")]
        columns: Option<String>,

        #[arg(
            long,
            help = "If set, prints the page as JSON instead of a table"
        )]
        json: bool,
    },
    State {
        #[command(subcommand)]
        command: StateCommand,
    },
}

#[derive(Subcommand)]
pub enum StateCommand {
    /// List the pager ids with stored view state
    List,
    /// Print the stored view state of a pager
    Show {
        #[arg(long, help = "Pager id")]
        id: String,
    },
    /// Forget the stored view state of a pager
    Clear {
        #[arg(long, help = "Pager id")]
        id: String,
    },
}
