
mod routing_table;
mod scenarios;
